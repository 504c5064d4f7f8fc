//! The shadow-stack anchor (component B).
//!
//! `TOP` names the innermost installed handler frame on the *current*
//! execution context. One context is one OS thread here: the engine has
//! no scheduler of its own, so "execution context" and "thread" coincide
//! for every driver in this crate (§5).
//!
//! Every mutation of `TOP` is mediated by [`Installed::push`] (normal
//! scoped install/uninstall) or by the yield path (§4.5), which needs to
//! detach and reattach `TOP` around a substrate yield. No other code in
//! this crate reads or writes the cell directly.

use std::cell::RefCell;

use crate::frame::Frame;

thread_local! {
    static TOP: RefCell<Option<Frame>> = const { RefCell::new(None) };
}

/// The innermost installed frame on this execution context, if any.
pub fn top() -> Option<Frame> {
    TOP.with(|t| t.borrow().clone())
}

/// `frame`'s parent, or [`top`] if `frame` is `None`.
pub fn parent(frame: Option<&Frame>) -> Option<Frame> {
    match frame {
        Some(f) => f.parent(),
        None => top(),
    }
}

/// The kind tag carried by `frame`'s header.
pub fn kind(frame: &Frame) -> crate::kind::Kind {
    frame.kind
}

pub(crate) fn get_top() -> Option<Frame> {
    TOP.with(|t| t.borrow().clone())
}

pub(crate) fn set_top(frame: Option<Frame>) {
    TOP.with(|t| *t.borrow_mut() = frame);
}

/// A scope guard that installs a frame atop `TOP` on construction and
/// restores the previous `TOP` on drop, on every exit path including
/// unwinding. This is the engine's only sanctioned way for external code
/// to push a frame.
pub(crate) struct Installed {
    previous: Option<Frame>,
}

impl Installed {
    pub(crate) fn push(frame: Frame) -> Self {
        let previous = get_top();
        tracing::trace!(kind = ?frame.kind, "install handler frame");
        set_top(Some(frame));
        Installed { previous }
    }
}

impl Drop for Installed {
    fn drop(&mut self) {
        set_top(self.previous.take());
    }
}
