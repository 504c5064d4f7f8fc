//! Effect kinds.
//!
//! A [`Kind`] identifies an effect. Two kinds are equal iff they were minted
//! by the same [`Kind::fresh`] call — equality is identity, never structural,
//! matching the opaque `mph_kind_t` handle of the substrate this engine is
//! modeled on.

use std::sync::atomic::{AtomicU64, Ordering};

/// An opaque, identity-compared effect kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kind(u64);

/// Kinds below this value are reserved for the runtime itself and are never
/// handed out by [`Kind::fresh`].
const RESERVED: u64 = 3;

static NEXT: AtomicU64 = AtomicU64::new(RESERVED);

impl Kind {
    /// Mint a fresh, globally unique kind.
    ///
    /// Every call returns a kind distinct from every other kind ever minted
    /// on the process, reserved ones included.
    pub fn fresh() -> Self {
        Kind(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) const fn reserved(id: u64) -> Self {
        assert!(id < RESERVED);
        Kind(id)
    }
}

/// Marks the internal handler frame installed by a `FINALLY` block.
///
/// Reserved for a future extension (see the design notes on unwind
/// transport); no driver in this crate installs a frame of this kind yet.
pub const FINALLY: Kind = Kind::reserved(0);

/// Marks an [`under`](crate::scope::under) scope marker frame.
pub const UNDER: Kind = Kind::reserved(1);

/// Marks a [`mask`](crate::scope::mask) scope marker frame.
pub const MASK: Kind = Kind::reserved(2);
