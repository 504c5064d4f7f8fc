//! Resume tokens and the resume family (component G).
//!
//! A [`ResumeToken`] represents a captured continuation waiting to be
//! driven. One-shot tokens (from [`crate::yield_path::yield_to`]) accept
//! exactly one of [`ResumeToken::resume`], [`ResumeToken::resume_tail`],
//! [`ResumeToken::resume_unwind`] or [`ResumeToken::resume_drop`]; calling
//! `resume`/`resume_tail` again afterward is a contract violation and
//! panics. Multi-shot tokens (from [`crate::yield_path::myield_to`]) may
//! call `resume`/`resume_tail` any number of times, each producing an
//! independent replayed result; because every such call already settles
//! the owning prompt's result (see [`Drop`] below), a multi-shot token
//! dropped after at least one resume is not a leak, though calling
//! `resume_unwind`/`resume_drop` as an explicit final disposition remains
//! fine and matches the documented contract literally.

use std::any::Any;
use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::ids::PromptId;
use crate::prompt::{self, Session};

/// A live, capturable continuation handed to handler-side code.
///
/// `T` is the owning prompt's handler-local data type, `A` its argument
/// type, `R` its overall result type, and `Y` the type of value the
/// original [`crate::yield_path::yield_to`]/`myield_to` call is waiting
/// to receive.
pub struct ResumeToken<T, A, R, Y> {
    pub(crate) prompt: PromptId,
    pub(crate) position: usize,
    pub(crate) multi: bool,
    pub(crate) session: Arc<Session<T, A, R>>,
    pub(crate) consumed: Cell<bool>,
    /// Set by every call that has ever driven this token toward a result:
    /// `resume`/`resume_tail` (even repeatedly, on a multi-shot token) and
    /// the two terminal ops. Distinct from `consumed`, which for a
    /// multi-shot token only flips on a terminal op — `settled` is what
    /// [`Drop`] checks, since a multi-shot token that has produced at
    /// least one replayed result is not a leak even if never explicitly
    /// terminated.
    pub(crate) settled: Cell<bool>,
    pub(crate) _marker: PhantomData<Y>,
}

impl<T, A, R, Y> ResumeToken<T, A, R, Y>
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + 'static,
    Y: Send + 'static,
{
    /// Resume the captured continuation with `value`, running it to
    /// completion (replaying from the top of the owning prompt) and
    /// returning the prompt's eventual result.
    ///
    /// # Panics
    ///
    /// Panics if this token has already been consumed.
    pub fn resume(&self, value: Y) -> R {
        assert!(
            !self.consumed.get(),
            "resume token already consumed (one-shot tokens accept exactly one resume)"
        );
        if !self.multi {
            self.consumed.set(true);
        }
        {
            let mut log = self.session.log.lock();
            log.truncate(self.position);
            log.push(Box::new(value) as Box<dyn Any + Send>);
        }
        let result = prompt::run_attempt::<T, A, R>(self.prompt, &self.session);
        *self.session.final_result.lock() = Some(result.clone());
        self.settled.set(true);
        result
    }

    /// Semantically identical to [`ResumeToken::resume`] from the
    /// caller's perspective; a tail-position resume is free to let the
    /// substrate reuse the current stack instead of growing it. This
    /// reference substrate has no native stack to reuse, so the two are
    /// implemented identically.
    pub fn resume_tail(&self, value: Y) -> R {
        self.resume(value)
    }

    /// Whether dropping this token without resuming it must instead
    /// unwind. This reference substrate never requires it: it has no
    /// external cancellation signal that could make abandoning a
    /// continuation unsafe, unlike a substrate backed by real OS threads
    /// or fibers might.
    pub fn should_unwind(&self) -> bool {
        false
    }
}

impl<T, A, R, Y> ResumeToken<T, A, R, Y>
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + Default + 'static,
    Y: Send + 'static,
{
    /// Consume the token, discarding the captured continuation and
    /// forcing the owning prompt to unwind: control transfers directly
    /// to the target prompt's catch site via [`crate::unwind`], skipping
    /// any intervening handler bodies, with the target frame's
    /// handler-local data still live at that site for a future
    /// `FINALLY`-style cleanup to observe (no driver installs one yet,
    /// so today nothing reads it and the prompt settles on
    /// `R::default()` — matching `mph_resume_unwind`'s "discard any
    /// return value" contract, since no payload of the caller's choosing
    /// is threaded through).
    ///
    /// Unlike [`ResumeToken::resume_drop`], this always triggers a real
    /// unwind through [`crate::unwind`] rather than merely settling the
    /// result in place, and never returns to its caller.
    ///
    /// # Panics
    ///
    /// Panics if this token has already been consumed.
    pub fn resume_unwind(self) -> ! {
        assert!(!self.consumed.get(), "resume token already consumed");
        self.consumed.set(true);
        self.settled.set(true);
        let fun: crate::unwind::UnwindFn =
            Box::new(|_hdata: &mut dyn Any| Box::new(R::default()) as Box<dyn Any + Send>);
        crate::unwind::raise(self.prompt, fun)
    }

    /// Consume the token without resuming or unwinding it.
    ///
    /// The real `mph_resume_drop` takes no value to hand back because the
    /// discarded continuation's caller never observes one; here, where
    /// the prompt's overall result type `R` is a concrete Rust type, the
    /// engine still owes the enclosing [`crate::prompt::prompt_handler`]
    /// call *some* final value once its body's continuation is abandoned
    /// rather than resumed, so this uses `R::default()`.
    ///
    /// If [`ResumeToken::should_unwind`] reports `true`, the caller must
    /// use [`ResumeToken::resume_unwind`] instead; a captured
    /// continuation can never be silently dropped when unwinding is
    /// required of it.
    ///
    /// # Panics
    ///
    /// Panics if [`ResumeToken::should_unwind`] is `true`, or if this
    /// token has already been consumed.
    pub fn resume_drop(self) {
        assert!(!self.consumed.get(), "resume token already consumed");
        assert!(
            !self.should_unwind(),
            "this token must unwind; call resume_unwind instead of resume_drop"
        );
        self.consumed.set(true);
        self.settled.set(true);
        *self.session.final_result.lock() = Some(R::default());
    }
}

impl<T, A, R, Y> Drop for ResumeToken<T, A, R, Y> {
    /// Detects a resume token that was dropped without being consumed by
    /// exactly one of `resume`/`resume_tail`/`resume_unwind`/`resume_drop`
    /// (§5, §7: undefined behavior to leak a token). Rather than leaving
    /// this as silent UB, the engine surfaces it as a panic naming the
    /// owning prompt, unless the thread is already unwinding — a token
    /// legitimately goes unconsumed while propagating an unrelated panic
    /// or an in-flight [`crate::unwind`] signal through handler code.
    fn drop(&mut self) {
        if !self.settled.get() && !std::thread::panicking() {
            tracing::error!(prompt = ?self.prompt, "resume token dropped without being consumed");
            panic!(
                "resume token leaked: every yield must be matched by exactly one of \
                 resume/resume_tail/resume_unwind/resume_drop"
            );
        }
    }
}
