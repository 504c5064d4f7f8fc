//! The prompt handler driver (component E) and its replay session
//! bookkeeping.
//!
//! A prompt handler installs a capturable frame and drives a *session*:
//! the handler-local data initializer, the effectful body, and the
//! argument it was first called with, kept around so that a resumed
//! continuation can be replayed from the top (see the module docs on
//! [`crate::yield_path`] for why replay, not real stack capture, is this
//! crate's way of giving a pluggable substrate a concrete, fully-safe
//! body).

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::frame::{FrameCell, HData};
use crate::ids::PromptId;
use crate::kind::Kind;
use crate::stack::{self, Installed};
use crate::unwind;

pub(crate) struct Session<T, A, R> {
    pub(crate) kind: Kind,
    pub(crate) hdata_init: Box<dyn Fn() -> T + Send + Sync>,
    pub(crate) body: Box<dyn Fn(A) -> R + Send + Sync>,
    pub(crate) arg: A,
    pub(crate) log: Mutex<Vec<Box<dyn Any + Send>>>,
    pub(crate) final_result: Mutex<Option<R>>,
}

thread_local! {
    static SESSIONS: RefCell<HashMap<PromptId, Arc<dyn Any + Send + Sync>>> =
        RefCell::new(HashMap::new());
    static CURSORS: RefCell<HashMap<PromptId, usize>> = RefCell::new(HashMap::new());
}

pub(crate) fn reset_cursor(id: PromptId) {
    CURSORS.with(|c| {
        c.borrow_mut().insert(id, 0);
    });
}

pub(crate) fn next_position(id: PromptId) -> usize {
    CURSORS.with(|c| {
        let mut map = c.borrow_mut();
        let entry = map.entry(id).or_insert(0);
        let pos = *entry;
        *entry += 1;
        pos
    })
}

fn register_session<T, A, R>(id: PromptId, session: Arc<Session<T, A, R>>)
where
    T: Send + 'static,
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    SESSIONS.with(|s| {
        s.borrow_mut().insert(id, session as Arc<dyn Any + Send + Sync>);
    });
}

fn unregister_session(id: PromptId) {
    SESSIONS.with(|s| {
        s.borrow_mut().remove(&id);
    });
    CURSORS.with(|c| {
        c.borrow_mut().remove(&id);
    });
}

pub(crate) fn session_for<T, A, R>(id: PromptId) -> Arc<Session<T, A, R>>
where
    T: Send + 'static,
    A: Send + Sync + 'static,
    R: Send + Sync + 'static,
{
    SESSIONS.with(|s| {
        s.borrow()
            .get(&id)
            .cloned()
            .expect("no active prompt session for this prompt id")
            .downcast::<Session<T, A, R>>()
            .expect("prompt session type mismatch")
    })
}

/// Install a capturable handler frame of `kind` around `body(arg)`, owning
/// freshly-initialized handler-local data for each run.
///
/// `body` and `hdata_init` must be pure and side-effect-free up to (and
/// including choosing to reach) any [`crate::yield_path::yield_to`] or
/// [`crate::yield_path::myield_to`] call inside them: a captured
/// continuation is resumed here by re-running `body` from the top and
/// fast-forwarding deterministically through previously-recorded
/// decisions, not by reinstating a suspended native stack. See the crate
/// design notes for why.
pub fn prompt_handler<T, A, R>(
    kind: Kind,
    hdata_init: impl Fn() -> T + Send + Sync + 'static,
    arg: A,
    body: impl Fn(A) -> R + Send + Sync + 'static,
) -> R
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + 'static,
{
    let prompt_id = PromptId::fresh();
    tracing::debug!(kind = ?kind, "installing prompt handler");
    let session = Arc::new(Session {
        kind,
        hdata_init: Box::new(hdata_init),
        body: Box::new(body),
        arg,
        log: Mutex::new(Vec::new()),
        final_result: Mutex::new(None),
    });
    register_session(prompt_id, session.clone());
    let result = run_attempt::<T, A, R>(prompt_id, &session);
    unregister_session(prompt_id);
    result
}

pub(crate) fn run_attempt<T, A, R>(prompt_id: PromptId, session: &Session<T, A, R>) -> R
where
    T: Send + 'static,
    A: Send + Sync + Clone + 'static,
    R: Send + Sync + Clone + 'static,
{
    reset_cursor(prompt_id);

    let hdata: T = (session.hdata_init)();
    let parent = stack::top();
    let frame = FrameCell::new_user(
        parent,
        Some(prompt_id),
        session.kind,
        HData::Owned(Mutex::new(Box::new(hdata))),
    );
    // Kept alive through the match below so an unwind-fn can still reach
    // this frame's handler-local data (§4.4, §4.8): `_guard` only
    // controls whether the frame is reachable from `TOP`, not whether it
    // is alive — this clone keeps it alive regardless.
    let _guard = Installed::push(frame.clone());

    match unwind::catch_at(prompt_id, || (session.body)(session.arg.clone())) {
        unwind::Outcome::Returned(r) => r,
        unwind::Outcome::Unwound(fun) => {
            let boxed = crate::frame::with_data_dyn(&frame, fun);
            *boxed
                .downcast::<R>()
                .expect("unwind-fn result type mismatch")
        }
    }
}
