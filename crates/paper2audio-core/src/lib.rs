use std::future::Future;
use std::path::PathBuf;

use tokio_util::sync::CancellationToken;

pub mod backend;
pub mod config_file;
pub mod credentials;
pub mod document;
pub mod pipeline;
pub mod process;
pub mod script;
pub mod speech;
pub mod summarize;

// Re-export for convenience
pub use backend::{ExtractionError, PdfBackend};
pub use credentials::{CredentialProvider, EnvCredentials, StaticCredentials};
pub use document::{Document, extract};
pub use pipeline::{Pipeline, PipelineError, PipelineEvent, RunReport};
pub use process::Tool;
pub use script::{Template, make_prompt, target_word_count};
pub use speech::{Ffmpeg, Speaker, SpeechProvider, SynthesisError, Transcoder, build_speaker};
pub use summarize::{SummarizeError, Summarizer, SummaryProvider, build_summarizer};

/// Summarization settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmConfig {
    /// `openai`, `ollama`, or anything else for the offline fallback.
    pub provider: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub ollama_model: String,
    /// Base URL of the local generation server (without `/api/generate`).
    pub ollama_url: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            openai_model: summarize::openai::DEFAULT_MODEL.to_string(),
            openai_base_url: summarize::openai::DEFAULT_BASE_URL.to_string(),
            ollama_model: summarize::ollama::DEFAULT_MODEL.to_string(),
            ollama_url: summarize::ollama::DEFAULT_URL.to_string(),
        }
    }
}

/// Speech settings.
#[derive(Debug, Clone, PartialEq)]
pub struct TtsConfig {
    /// `piper`, `say`, `openai`, `elevenlabs`; anything else means `say`.
    pub provider: String,
    pub piper_voice: Option<PathBuf>,
    pub piper_voice_json: Option<PathBuf>,
    pub say_voice: Option<String>,
    pub openai_voice: String,
    pub openai_model: String,
    pub openai_base_url: String,
    pub eleven_voice: String,
    pub eleven_base_url: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            provider: String::new(),
            piper_voice: None,
            piper_voice_json: None,
            say_voice: None,
            openai_voice: speech::openai::DEFAULT_VOICE.to_string(),
            openai_model: speech::openai::DEFAULT_MODEL.to_string(),
            openai_base_url: speech::openai::DEFAULT_BASE_URL.to_string(),
            eleven_voice: speech::elevenlabs::DEFAULT_VOICE.to_string(),
            eleven_base_url: speech::elevenlabs::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Narration length and prompt style.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleConfig {
    /// Values <= 0 fall back to [`script::DEFAULT_MINUTES`].
    pub target_minutes: i32,
    /// Values <= 0 fall back to [`script::DEFAULT_WPM`].
    pub wpm: i32,
    pub template: Template,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            target_minutes: script::DEFAULT_MINUTES,
            wpm: script::DEFAULT_WPM,
            template: Template::General,
        }
    }
}

/// External programs used by the local speech engines.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolsConfig {
    pub piper: Tool,
    pub say: Tool,
    pub ffmpeg: Tool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            piper: Tool::new("piper"),
            say: Tool::new("say"),
            ffmpeg: Tool::new("ffmpeg"),
        }
    }
}

/// Full run configuration. Holds no secrets; credentials are looked up
/// through a [`CredentialProvider`] at call time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub style: StyleConfig,
    pub tools: ToolsConfig,
}

/// Run `fut` unless `cancel` fires first, in which case `on_cancel` is
/// returned and `fut` is dropped.
pub(crate) async fn until_cancelled<T, E>(
    cancel: &CancellationToken,
    on_cancel: E,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, E> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(on_cancel),
        res = fut => res,
    }
}
