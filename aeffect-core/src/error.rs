//! Diagnostics for contract violations (§7).
//!
//! Most of the invariants this engine relies on (a resume token consumed
//! at most once, handler-local data read back as the type it was stored
//! with, a handler frame reachable only through a live handle) are
//! programming-contract violations rather than runtime conditions a
//! caller can reasonably recover from, so they surface as panics with a
//! descriptive message at the point of violation, the same way the
//! substrate this engine is modeled on uses assertions rather than error
//! codes for them.
//!
//! [`EngineError`] exists for the handful of conditions a caller can
//! meaningfully branch on instead of merely logging and crashing:
//! currently, looking up a handler that turns out not to be installed.

use thiserror::Error;

/// Errors a caller of this crate's public API may want to handle rather
/// than treat as a bug.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No handler of the requested kind was reachable from the current
    /// `TOP` when one was required.
    #[error("no handler of the requested kind is installed")]
    HandlerNotFound,
}
