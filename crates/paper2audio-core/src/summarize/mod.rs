//! Summarization backends: turn a generation request into narration text.

pub mod fallback;
pub mod ollama;
pub mod openai;
pub mod stream;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::LlmConfig;
use crate::credentials::CredentialProvider;

pub use fallback::Fallback;
pub use ollama::Ollama;
pub use openai::OpenAiChat;

/// Sampling temperature used by every LLM backend.
pub const TEMPERATURE: f32 = 0.2;

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("{0} not set")]
    MissingCredential(&'static str),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{backend}: HTTP {status}: {body}")]
    Status {
        backend: &'static str,
        status: u16,
        body: String,
    },
    #[error("{0}: no choices in response")]
    NoChoices(&'static str),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{backend}: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
    #[error("summarization cancelled")]
    Cancelled,
}

/// A backend that turns a rendered prompt into narration text.
pub trait Summarizer: Send + Sync {
    /// Provider name used in logs and progress output.
    fn name(&self) -> &str;

    /// Produce narration for `prompt`. The returned text is trimmed.
    fn summarize<'a>(
        &'a self,
        prompt: &'a str,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<String, SummarizeError>> + Send + 'a>>;
}

/// Closed set of summarization variants, keyed by provider name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryProvider {
    OpenAi,
    Ollama,
    Fallback,
}

impl SummaryProvider {
    /// Resolve a configured provider name. Empty or unknown names select
    /// [`SummaryProvider::Fallback`] rather than failing.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "openai" => SummaryProvider::OpenAi,
            "ollama" => SummaryProvider::Ollama,
            _ => SummaryProvider::Fallback,
        }
    }
}

/// Build the summarizer selected by `config.provider`.
pub fn build_summarizer(
    config: &LlmConfig,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
) -> Box<dyn Summarizer> {
    match SummaryProvider::from_name(&config.provider) {
        SummaryProvider::OpenAi => Box::new(OpenAiChat::new(
            &config.openai_model,
            &config.openai_base_url,
            client,
            credentials,
        )),
        SummaryProvider::Ollama => Box::new(Ollama::new(
            &config.ollama_model,
            &config.ollama_url,
            client,
        )),
        SummaryProvider::Fallback => Box::new(Fallback),
    }
}
