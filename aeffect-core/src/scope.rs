//! Scope markers: `under` and `mask` (component, §4.6).
//!
//! Both push a lightweight frame with no handler-local data and pop it
//! when `body` returns. They exist purely to steer [`crate::search::find`]
//! — `under` makes a named kind temporarily invisible to one specific
//! nested region, `mask` hides the next `from` enclosing matches of a
//! kind from everything nested under it.
//!
//! The real substrate this engine is modeled on has a documented bug
//! here: its `mask` installer tags the frame it pushes with the `under`
//! kind instead of `mask`, so `find` treats a `mask` scope as an `under`
//! scope at runtime. That bug is not reproduced — `mask` frames here
//! carry kind `MASK`, as intended.

use crate::frame::FrameCell;
use crate::kind::Kind;
use crate::stack::{self, Installed};

/// Run `body` with the innermost handler of `kind` hidden from it.
///
/// A [`crate::search::find`] call for `kind` made anywhere inside `body`
/// skips straight past the frame `under` would otherwise find, landing on
/// the next enclosing frame of that kind (or `None`).
pub fn under<R>(kind: Kind, body: impl FnOnce() -> R) -> R {
    let parent = stack::top();
    let frame = FrameCell::new_under(parent, kind);
    let _guard = Installed::push(frame);
    body()
}

/// Run `body` with the next `from` enclosing matches of `kind` hidden
/// from it, counting outward from the handler `body` would otherwise see
/// first.
///
/// `from == 0` hides the innermost matching handler; `from == 1` leaves
/// the innermost visible but hides the one beyond it, and so on.
pub fn mask<R>(kind: Kind, from: u32, body: impl FnOnce() -> R) -> R {
    let parent = stack::top();
    let frame = FrameCell::new_mask(parent, kind, from);
    let _guard = Installed::push(frame);
    body()
}
