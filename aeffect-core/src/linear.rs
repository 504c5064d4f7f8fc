//! The linear handler driver (component D).
//!
//! A linear handler installs a frame for the dynamic extent of a single
//! call and nothing more: it never sits atop a prompt, so it can never be
//! the target of a captured continuation. Its handler-local data is
//! borrowed from the caller rather than owned by the frame, matching the
//! "pointer to caller-owned hdata" contract.

use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::frame::{FrameCell, HData};
use crate::kind::Kind;
use crate::stack::{self, Installed};

/// Install a non-capturable handler frame of `kind` around `body`, and run
/// it with `hdata` borrowed for the call.
///
/// `body` (and anything it calls) can read and mutate `*hdata` through
/// [`crate::frame::with_data`] by calling [`crate::search::find`] with
/// `kind`; the frame is popped, and the borrow invalidated, before this
/// function returns on every exit path including unwinding.
pub fn linear_handler<T, A, R>(kind: Kind, hdata: &mut T, arg: A, body: impl FnOnce(A) -> R) -> R
where
    T: 'static,
{
    let live = Arc::new(AtomicBool::new(true));
    let ptr = std::ptr::NonNull::from(hdata).cast::<()>();
    let data = HData::Borrowed {
        ptr,
        type_id: TypeId::of::<T>(),
        live: live.clone(),
    };

    let parent = stack::top();
    let frame = FrameCell::new_user(parent, None, kind, data);
    let _guard = Installed::push(frame);

    struct MarkDeadOnDrop(Arc<AtomicBool>);
    impl Drop for MarkDeadOnDrop {
        fn drop(&mut self) {
            self.0.store(false, Ordering::Release);
        }
    }
    let _mark_dead = MarkDeadOnDrop(live);

    body(arg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::find;

    #[test]
    fn body_reads_and_mutates_caller_owned_data_through_find() {
        let ask = Kind::fresh();
        let mut state = 42i32;
        let result = linear_handler(ask, &mut state, (), |()| {
            let h = find(ask).expect("handler installed");
            crate::frame::with_data::<i32, i32>(&h, |v| {
                let seen = *v;
                *v += 1;
                seen
            })
        });
        assert_eq!(result, 42);
        assert_eq!(state, 43);
    }

    #[test]
    fn frame_is_gone_after_the_call_returns() {
        let ask = Kind::fresh();
        let mut state = 1i32;
        linear_handler(ask, &mut state, (), |()| {});
        assert!(find(ask).is_none());
    }
}
