//! The yield path (component F): detach, run the handler, reattach.
//!
//! [`yield_to`] and [`myield_to`] are how effectful code actually invokes
//! a handler it found with [`crate::search::find`]. Both follow the same
//! detach-yield-reattach protocol: save and clear `TOP` down to the
//! handler frame's own parent before running handler-side code (so that
//! code sees the stack *as it looked when the handler was installed*,
//! not the effectful code's deeper stack), then restore it once the
//! handler has decided how to proceed.
//!
//! ## Why replay, not real stack capture
//!
//! The substrate this engine delegates to is, in the design this crate
//! follows, a black box that can suspend and later reinstate an
//! arbitrary native call stack — including more than once, for
//! multi-shot. Implementing that directly would mean hand-rolled
//! stack-switching, which is exactly the kind of unsafe, unauditable
//! machinery this exercise has no way to validate without running it.
//!
//! Instead, this reference substrate gets the same *observable* behavior
//! a different way: every [`crate::prompt::prompt_handler`] remembers how
//! it was called (handler-local data initializer, body, argument) as a
//! *session*. A captured continuation is never actually suspended — the
//! scouting run that first reaches a yield point always calls the
//! handler exactly once (matching the real contract) and then, once the
//! handler has produced a final answer by resuming (directly or via
//! replay) or unwinding, aborts itself and hands that answer up as the
//! prompt's result. A `resume` call re-runs the prompt's body from the
//! top, fast-forwarding deterministically through every previously
//! recorded decision via a per-prompt log, and only performs a *real*
//! yield once it reaches a position beyond the log's end. For a pure,
//! deterministic body this is observationally identical to resuming a
//! captured stack; it is a documented simplification for bodies that
//! aren't (see `DESIGN.md`).

use crate::frame::Frame;
use crate::prompt;
use crate::resume::ResumeToken;
use crate::stack;
use crate::unwind;

fn yield_inner<T, A, R, Y, Op>(h: &Frame, multi: bool, op: Op) -> Y
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + 'static,
    Y: Send + Clone + 'static,
    Op: FnOnce(ResumeToken<T, A, R, Y>),
{
    let prompt_id = h
        .prompt
        .expect("yield target has no prompt; only a prompt handler's frame is capturable");
    let position = prompt::next_position(prompt_id);
    let session = prompt::session_for::<T, A, R>(prompt_id);

    {
        let log = session.log.lock();
        if position < log.len() {
            let value = log[position]
                .downcast_ref::<Y>()
                .expect("replay log entry type mismatch")
                .clone();
            return value;
        }
    }

    tracing::trace!(?multi, position, "yielding to handler");
    let saved_top = stack::get_top();
    stack::set_top(h.parent());
    let _restore = RestoreTop(Some(saved_top));

    let token = ResumeToken {
        prompt: prompt_id,
        position,
        multi,
        session: session.clone(),
        consumed: std::cell::Cell::new(false),
        settled: std::cell::Cell::new(false),
        _marker: std::marker::PhantomData,
    };
    op(token);

    drop(_restore);

    let final_value = session
        .final_result
        .lock()
        .take()
        .expect("handler returned without resuming, unwinding or dropping its token");
    unwind::raise_value(prompt_id, final_value);
}

/// Restores `TOP` to the saved value on every exit path out of
/// [`yield_inner`], including a panic unwind raised from inside `op` —
/// e.g. [`crate::resume::ResumeToken::resume_unwind`], which unwinds
/// directly rather than returning control to `op`'s caller. A bare
/// statement after `op(token)` would be skipped on that path, leaving
/// `TOP` detached to `h.parent()` for the rest of the unwind (§4.5's
/// "Ordering guarantee" requires restoration on every exit path,
/// matching [`crate::stack::Installed`]'s own guard).
struct RestoreTop(Option<Frame>);

impl Drop for RestoreTop {
    fn drop(&mut self) {
        stack::set_top(self.0.take());
    }
}

/// Capture a one-shot continuation and yield to `h`.
///
/// `op` runs exactly once, outside the prompt, with a token that accepts
/// exactly one of `resume`, `resume_tail`, `resume_unwind` or
/// `resume_drop`.
pub fn yield_to<T, A, R, Y, Op>(h: &Frame, op: Op) -> Y
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + 'static,
    Y: Send + Clone + 'static,
    Op: FnOnce(ResumeToken<T, A, R, Y>),
{
    yield_inner(h, false, op)
}

/// As [`yield_to`], but the resulting token may be resumed more than
/// once: each `resume`/`resume_tail` call independently replays the
/// owning prompt's body from the top with that call's value substituted
/// at this yield point, so the handler sees one full result per call.
pub fn myield_to<T, A, R, Y, Op>(h: &Frame, op: Op) -> Y
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + 'static,
    Y: Send + Clone + 'static,
    Op: FnOnce(ResumeToken<T, A, R, Y>),
{
    yield_inner(h, true, op)
}
