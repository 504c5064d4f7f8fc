//! Unwind transport (component H).
//!
//! A sealed control-transfer value that must propagate through every
//! frame between where it is raised and its target prompt, unchanged,
//! built on `std::panic`'s own unwinding so it composes with ordinary
//! Rust `Drop` glue (and so the crate's `Cargo.toml` must never set
//! `panic = "abort"` — see the design notes).
//!
//! The token carries the `{target, fun}` pair spec.md §4.8 describes
//! (`arg` is folded into `fun`'s closure capture rather than threaded as
//! a separate field — a Rust closure already owns whatever argument it
//! needs). `fun` is invoked at the target's catch site while that
//! frame's handler-local data is still live, per the property that a
//! `FINALLY`-style cleanup must be able to observe it (spec.md §8
//! property 7, scenario S5); no driver in this crate installs a
//! `FINALLY` frame yet, but the transport itself does not special-case
//! that — any unwind-fn, including a future one, runs the same way.
//!
//! This is also how a prompt handler's own scouting attempt is always
//! terminated once its handler has decided on a final answer (see
//! [`crate::yield_path`]): "abort the attempt with this result" and "a
//! real unwind token reached its target" are the same mechanism here,
//! just carrying different unwind-fns — [`raise_value`] supplies one
//! that ignores hdata and hands back an already-computed value.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::ids::PromptId;

/// A type-erased unwind-fn: run with the target frame's handler-local
/// data as `&mut dyn Any`, producing the boxed value that becomes the
/// target prompt's result.
pub(crate) type UnwindFn = Box<dyn FnOnce(&mut dyn Any) -> Box<dyn Any + Send> + Send>;

struct UnwindSignal {
    target: PromptId,
    fun: UnwindFn,
}

/// What [`catch_at`] observed at the boundary of `f`.
pub(crate) enum Outcome<R> {
    /// `f` returned normally.
    Returned(R),
    /// An unwind aimed at this call's target arrived; `fun` must be run
    /// with the target frame's handler-local data still live.
    Unwound(UnwindFn),
}

/// Raise a sealed unwind aimed at `target`, carrying `fun` as the
/// unwind-fn. Never returns; every frame between here and `target`'s
/// [`catch_at`] must let it propagate unchanged (the default for
/// ordinary Rust code — only an explicit `catch_unwind` can intercept
/// it, and this module is the only place in the crate that does).
pub(crate) fn raise(target: PromptId, fun: UnwindFn) -> ! {
    panic::resume_unwind(Box::new(UnwindSignal { target, fun }));
}

/// As [`raise`], for the common case of a value already computed rather
/// than a function that still needs hdata: the unwind-fn simply ignores
/// hdata and hands `value` back unchanged.
pub(crate) fn raise_value<R: Send + 'static>(target: PromptId, value: R) -> ! {
    raise(
        target,
        Box::new(move |_hdata: &mut dyn Any| Box::new(value) as Box<dyn Any + Send>),
    );
}

/// Run `f`, catching only an unwind aimed at `target`. Any other panic,
/// including one aimed at a different prompt, is rethrown unchanged so it
/// keeps propagating toward its own target (or the process, if it is a
/// genuine panic rather than one of ours).
pub(crate) fn catch_at<F, R>(target: PromptId, f: F) -> Outcome<R>
where
    F: FnOnce() -> R,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(r) => Outcome::Returned(r),
        Err(payload) => match payload.downcast::<UnwindSignal>() {
            Ok(signal) if signal.target == target => Outcome::Unwound(signal.fun),
            Ok(signal) => panic::resume_unwind(signal),
            Err(other) => panic::resume_unwind(other),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catch_at_target_recovers_the_unwind_fn_and_runs_it_with_hdata() {
        let id = PromptId::fresh();
        let outcome: Outcome<i32> = catch_at(id, || {
            raise_value(id, 7i32);
            #[allow(unreachable_code)]
            0
        });
        match outcome {
            Outcome::Unwound(fun) => {
                let mut hdata = 0i32;
                let result = fun(&mut hdata);
                assert_eq!(*result.downcast::<i32>().unwrap(), 7);
            }
            Outcome::Returned(_) => panic!("expected an unwind, got a normal return"),
        }
    }

    #[test]
    fn catch_at_rethrows_signals_aimed_elsewhere() {
        let mine = PromptId::fresh();
        let theirs = PromptId::fresh();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Outcome<()> = catch_at(mine, || {
                raise_value(theirs, 1i32);
            });
        }));
        assert!(outcome.is_err());
    }
}
