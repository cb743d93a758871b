use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use super::{SummarizeError, Summarizer};
use crate::script::LONGER_EXTRACT_MARKER;
use crate::until_cancelled;

/// Offline last-resort summarizer.
///
/// This is not real summarization: it returns the prompt's instruction and
/// metadata block (everything before the body excerpt), trimmed. Without the
/// marker the whole prompt is returned, trimmed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fallback;

/// Split `prompt` at the last body-excerpt marker and keep the prefix.
pub fn narration_from_prompt(prompt: &str) -> String {
    match prompt.rfind(LONGER_EXTRACT_MARKER) {
        Some(idx) => prompt[..idx].trim().to_string(),
        None => prompt.trim().to_string(),
    }
}

impl Summarizer for Fallback {
    fn name(&self) -> &str {
        "fallback"
    }

    fn summarize<'a>(
        &'a self,
        prompt: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<String, SummarizeError>> + Send + 'a>> {
        Box::pin(until_cancelled(cancel, SummarizeError::Cancelled, async move {
            Ok(narration_from_prompt(prompt))
        }))
    }
}
