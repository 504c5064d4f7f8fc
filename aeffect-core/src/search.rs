//! Handler search (component C).
//!
//! [`find`] walks the shadow stack from `TOP` looking for the innermost
//! frame of a given [`Kind`], honoring `under` fast-forwards and `mask`
//! masking exactly as laid out in the design this engine follows.

use crate::error::EngineError;
use crate::frame::Frame;
use crate::kind::{self, Kind};
use crate::stack;

/// The innermost frame of `kind` visible from the current `TOP`, or
/// `None` if no such frame is reachable.
///
/// `mask_level` counts how many enclosing `mask` frames have currently
/// hidden a match of `kind`; a matching user frame is only returned once
/// `mask_level` has been drawn back down to zero by that many more
/// matches passed over.
pub fn find(k: Kind) -> Option<Frame> {
    let mut cursor = stack::top();
    let mut mask_level: u32 = 0;

    loop {
        let h = cursor?;

        if h.kind == k {
            if mask_level == 0 {
                return Some(h);
            }
            mask_level -= 1;
            cursor = h.parent();
        } else if h.kind == kind::UNDER {
            let target = h.variant.under_target();
            let mut p = h.parent();
            while let Some(pf) = p {
                if pf.kind == target {
                    p = Some(pf);
                    break;
                }
                p = pf.parent();
            }
            // `p` is the frame of `target`'s kind the `under` marker
            // hides, or `None` if the stack ran out first. Either way we
            // fall through to the unconditional advance below, which
            // skips past that frame too (an `under` hides everything
            // between itself and its target, target included).
            cursor = match p {
                Some(found) => found.parent(),
                None => return None,
            };
        } else if h.kind == kind::MASK {
            let (target, from) = h.variant.mask_fields();
            if target == k && from <= mask_level {
                mask_level += 1;
            }
            cursor = h.parent();
        } else {
            cursor = h.parent();
        }
    }
}

/// As [`find`], but for call sites that would rather propagate "no
/// handler" with `?` than match on an `Option` themselves.
///
/// The engine never raises on a missing handler on its own (§7): this is
/// a convenience for binding layers built on top of it, not a new search
/// semantic. `find` stays the primitive.
pub fn require(k: Kind) -> Result<Frame, EngineError> {
    find(k).ok_or_else(|| {
        tracing::error!(kind = ?k, "no handler installed for this kind");
        EngineError::HandlerNotFound
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{FrameCell, HData};
    use crate::stack::Installed;
    use std::sync::Arc;

    fn user_frame(parent: Option<Frame>, k: Kind) -> Frame {
        FrameCell::new_user(parent, None, k, HData::None)
    }

    #[test]
    fn finds_innermost_matching_frame() {
        let ask = Kind::fresh();
        let outer = user_frame(None, ask);
        let _g1 = Installed::push(outer.clone());
        let inner = user_frame(Some(outer.clone()), ask);
        let _g2 = Installed::push(inner.clone());

        let found = find(ask).expect("should find a handler");
        assert!(Arc::ptr_eq(&found, &inner));
    }

    #[test]
    fn returns_none_when_absent() {
        let ask = Kind::fresh();
        assert!(find(ask).is_none());
    }

    #[test]
    fn under_skips_inner_frame_of_the_named_kind() {
        let ask = Kind::fresh();
        let outer = user_frame(None, ask);
        let _g1 = Installed::push(outer.clone());
        let inner = user_frame(Some(outer.clone()), ask);
        let _g2 = Installed::push(inner.clone());
        let marker = FrameCell::new_under(Some(inner.clone()), ask);
        let _g3 = Installed::push(marker);

        let found = find(ask).expect("should find the outer handler");
        assert!(Arc::ptr_eq(&found, &outer));
    }

    #[test]
    fn mask_hides_one_enclosing_match() {
        let ask = Kind::fresh();
        let outer = user_frame(None, ask);
        let _g1 = Installed::push(outer.clone());
        let m = FrameCell::new_mask(Some(outer.clone()), ask, 0);
        let _g2 = Installed::push(m);

        assert!(find(ask).is_none());
    }

    #[test]
    fn require_mirrors_find_but_reports_the_miss_as_an_error() {
        let ask = Kind::fresh();
        assert!(matches!(require(ask), Err(EngineError::HandlerNotFound)));

        let outer = user_frame(None, ask);
        let _g = Installed::push(outer.clone());
        let found = require(ask).expect("handler is installed");
        assert!(Arc::ptr_eq(&found, &outer));
    }
}
