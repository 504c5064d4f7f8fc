//! Fresh, process-unique identifiers used throughout the engine.

use std::sync::atomic::{AtomicU64, Ordering};

/// Names the prompt a capturable handler frame is installed under.
///
/// Minted once per [`crate::prompt::prompt_handler`] activation; two prompt
/// ids are equal only if they name the very same activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptId(u64);

static NEXT_PROMPT: AtomicU64 = AtomicU64::new(0);

impl PromptId {
    pub(crate) fn fresh() -> Self {
        PromptId(NEXT_PROMPT.fetch_add(1, Ordering::Relaxed))
    }
}
