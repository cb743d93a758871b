//! The sequential PDF -> prompt -> narration -> audio run.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::backend::{ExtractionError, PdfBackend};
use crate::credentials::CredentialProvider;
use crate::document::{self, Document};
use crate::script::{self, Template};
use crate::speech::{self, Speaker, SynthesisError, Transcoder};
use crate::summarize::{self, SummarizeError, Summarizer};
use crate::{Config, StyleConfig, until_cancelled};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("summarization failed: {0}")]
    Summarize(#[from] SummarizeError),
    #[error("speech synthesis failed: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            PipelineError::Cancelled
                | PipelineError::Summarize(SummarizeError::Cancelled)
                | PipelineError::Synthesis(SynthesisError::Cancelled)
        )
    }
}

/// Progress events emitted during a run, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Extracted {
        title: String,
        headings: Vec<&'static str>,
        body_words: usize,
    },
    PromptBuilt {
        target_words: u32,
        prompt_chars: usize,
    },
    Summarized {
        provider: String,
        words: usize,
    },
    ScriptSaved {
        path: PathBuf,
    },
    /// Non-fatal: the run continues to synthesis.
    ScriptWriteFailed {
        path: PathBuf,
        error: String,
    },
    Synthesized {
        provider: String,
        path: PathBuf,
    },
}

/// Outcome of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub title: String,
    pub target_words: u32,
    pub narration_words: usize,
    pub audio_path: PathBuf,
}

pub struct Pipeline {
    pdf: Arc<dyn PdfBackend>,
    summarizer: Box<dyn Summarizer>,
    speaker: Box<dyn Speaker>,
    style: StyleConfig,
}

impl Pipeline {
    pub fn new(
        pdf: Arc<dyn PdfBackend>,
        summarizer: Box<dyn Summarizer>,
        speaker: Box<dyn Speaker>,
    ) -> Self {
        Self {
            pdf,
            summarizer,
            speaker,
            style: StyleConfig::default(),
        }
    }

    /// Build both backends from `config`.
    pub fn from_config(
        config: &Config,
        pdf: Arc<dyn PdfBackend>,
        credentials: Arc<dyn CredentialProvider>,
        client: reqwest::Client,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let summarizer = summarize::build_summarizer(&config.llm, credentials.clone(), client.clone());
        let speaker =
            speech::build_speaker(&config.tts, &config.tools, credentials, client, transcoder);
        Self::new(pdf, summarizer, speaker).with_style(config.style.clone())
    }

    pub fn with_style(mut self, style: StyleConfig) -> Self {
        self.style = style;
        self
    }

    pub fn template(&self) -> Template {
        self.style.template
    }

    pub fn summarizer_name(&self) -> &str {
        self.summarizer.name()
    }

    pub fn speaker_name(&self) -> &str {
        self.speaker.name()
    }

    /// Narration length requested from the summarizer.
    pub fn target_words(&self) -> u32 {
        script::target_word_count(self.style.target_minutes, self.style.wpm)
    }

    /// Run every stage in sequence. The first failure ends the run.
    ///
    /// `script_out`, when given, receives the narration text before
    /// synthesis starts; failing to write it is reported through `progress`
    /// and does not stop the run. `cancel` is checked before every stage, so
    /// a cancelled run writes nothing.
    pub async fn run(
        &self,
        pdf_path: &Path,
        out_path: &Path,
        script_out: Option<&Path>,
        progress: impl Fn(PipelineEvent),
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let started = Instant::now();
        let doc = until_cancelled(cancel, PipelineError::Cancelled, self.extract(pdf_path)).await?;
        tracing::info!(
            path = %pdf_path.display(),
            title = doc.title(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "extracted document"
        );
        progress(PipelineEvent::Extracted {
            title: doc.title().to_string(),
            headings: doc.headings().to_vec(),
            body_words: doc.body().split_whitespace().count(),
        });

        let target_words = self.target_words();
        let prompt = self.style.template.render(&doc, target_words);
        progress(PipelineEvent::PromptBuilt {
            target_words,
            prompt_chars: prompt.chars().count(),
        });

        ensure_live(cancel)?;
        let started = Instant::now();
        let narration = self.summarizer.summarize(&prompt, cancel).await?;
        let words = narration.split_whitespace().count();
        tracing::info!(
            provider = self.summarizer.name(),
            words,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "narration ready"
        );
        progress(PipelineEvent::Summarized {
            provider: self.summarizer.name().to_string(),
            words,
        });

        ensure_live(cancel)?;
        if let Some(path) = script_out {
            match tokio::fs::write(path, narration.as_bytes()).await {
                Ok(()) => progress(PipelineEvent::ScriptSaved {
                    path: path.to_path_buf(),
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "failed to write narration script");
                    progress(PipelineEvent::ScriptWriteFailed {
                        path: path.to_path_buf(),
                        error: e.to_string(),
                    });
                }
            }
        }

        ensure_live(cancel)?;
        let started = Instant::now();
        self.speaker.speak(&narration, out_path, cancel).await?;
        tracing::info!(
            provider = self.speaker.name(),
            path = %out_path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "audio written"
        );
        progress(PipelineEvent::Synthesized {
            provider: self.speaker.name().to_string(),
            path: out_path.to_path_buf(),
        });

        Ok(RunReport {
            title: doc.title().to_string(),
            target_words,
            narration_words: words,
            audio_path: out_path.to_path_buf(),
        })
    }

    /// Decode the PDF on the blocking pool; MuPDF is synchronous.
    async fn extract(&self, pdf_path: &Path) -> Result<Document, PipelineError> {
        let pdf = Arc::clone(&self.pdf);
        let path = pdf_path.to_path_buf();
        tokio::task::spawn_blocking(move || document::extract(&path, pdf.as_ref()))
            .await
            .unwrap_or_else(|e| Err(ExtractionError::Decode(format!("extraction task failed: {e}"))))
            .map_err(PipelineError::from)
    }
}

fn ensure_live(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use crate::summarize::Fallback;

    struct TextBackend(&'static str);

    impl PdfBackend for TextBackend {
        fn extract_text(&self, _path: &Path) -> Result<String, ExtractionError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingBackend;

    impl PdfBackend for FailingBackend {
        fn extract_text(&self, path: &Path) -> Result<String, ExtractionError> {
            Err(ExtractionError::Open(format!("{}: no such file", path.display())))
        }
    }

    /// Writes the narration itself as the "audio".
    struct TextSpeaker;

    impl Speaker for TextSpeaker {
        fn name(&self) -> &str {
            "text"
        }

        fn speak<'a>(
            &'a self,
            text: &'a str,
            out_path: &'a Path,
            _cancel: &'a CancellationToken,
        ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>> {
            Box::pin(async move {
                std::fs::write(out_path, text)?;
                Ok(())
            })
        }
    }

    /// Records whether it was reached.
    struct RecordingSpeaker(Arc<Mutex<bool>>);

    impl Speaker for RecordingSpeaker {
        fn name(&self) -> &str {
            "recording"
        }

        fn speak<'a>(
            &'a self,
            _text: &'a str,
            _out_path: &'a Path,
            _cancel: &'a CancellationToken,
        ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>> {
            *self.0.lock().unwrap() = true;
            Box::pin(async { Ok(()) })
        }
    }

    struct CancelledSummarizer;

    impl Summarizer for CancelledSummarizer {
        fn name(&self) -> &str {
            "cancelled"
        }

        fn summarize<'a>(
            &'a self,
            _prompt: &'a str,
            _cancel: &'a CancellationToken,
        ) -> Pin<Box<dyn Future<Output = Result<String, SummarizeError>> + Send + 'a>> {
            Box::pin(async { Err(SummarizeError::Cancelled) })
        }
    }

    const PAPER: &str = "A Study of Things\nAda Lovelace\nAbstract We study things.\n\
                         Introduction\nThings matter.\nResults\nThings work.";

    #[tokio::test]
    async fn events_arrive_in_stage_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.txt");
        let script = dir.path().join("talk.script.txt");
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(Fallback),
            Box::new(TextSpeaker),
        );

        let events = Mutex::new(Vec::new());
        let report = pipeline
            .run(
                Path::new("paper.pdf"),
                &out,
                Some(&script),
                |e| events.lock().unwrap().push(e),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 5);
        assert!(matches!(
            &events[0],
            PipelineEvent::Extracted { title, headings, .. }
                if title == "A Study of Things" && headings == &["introduction", "results"]
        ));
        assert!(matches!(
            events[1],
            PipelineEvent::PromptBuilt {
                target_words: 1620,
                ..
            }
        ));
        assert!(matches!(&events[2], PipelineEvent::Summarized { provider, .. } if provider == "fallback"));
        assert!(matches!(&events[3], PipelineEvent::ScriptSaved { path } if path == &script));
        assert!(matches!(&events[4], PipelineEvent::Synthesized { provider, .. } if provider == "text"));

        let narration = std::fs::read_to_string(&script).unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), narration);
        assert_eq!(report.title, "A Study of Things");
        assert_eq!(report.target_words, 1620);
        assert_eq!(report.narration_words, narration.split_whitespace().count());
        assert_eq!(report.audio_path, out);
    }

    #[tokio::test]
    async fn script_write_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.txt");
        let script = dir.path().join("missing-dir").join("script.txt");
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(Fallback),
            Box::new(TextSpeaker),
        );

        let events = Mutex::new(Vec::new());
        pipeline
            .run(
                Path::new("paper.pdf"),
                &out,
                Some(&script),
                |e| events.lock().unwrap().push(e),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let events = events.into_inner().unwrap();
        assert!(
            events
                .iter()
                .any(|e| matches!(e, PipelineEvent::ScriptWriteFailed { .. }))
        );
        assert!(out.exists());
    }

    #[tokio::test]
    async fn style_sets_word_budget() {
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(Fallback),
            Box::new(TextSpeaker),
        )
        .with_style(StyleConfig {
            target_minutes: 15,
            wpm: 150,
            template: Template::Expert,
        });
        assert_eq!(pipeline.target_words(), 2025);
        assert_eq!(pipeline.template(), Template::Expert);
    }

    #[tokio::test]
    async fn extraction_failure_stops_before_backends() {
        let reached = Arc::new(Mutex::new(false));
        let pipeline = Pipeline::new(
            Arc::new(FailingBackend),
            Box::new(Fallback),
            Box::new(RecordingSpeaker(reached.clone())),
        );
        let err = pipeline
            .run(
                Path::new("missing.pdf"),
                Path::new("out.m4a"),
                None,
                |_| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Extraction(ExtractionError::Open(_))));
        assert!(!*reached.lock().unwrap());
    }

    #[tokio::test]
    async fn summarizer_failure_skips_synthesis() {
        let reached = Arc::new(Mutex::new(false));
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(CancelledSummarizer),
            Box::new(RecordingSpeaker(reached.clone())),
        );
        let err = pipeline
            .run(
                Path::new("paper.pdf"),
                Path::new("out.m4a"),
                None,
                |_| {},
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(!*reached.lock().unwrap());
    }

    #[tokio::test]
    async fn cancelled_run_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.txt");
        let script = dir.path().join("talk.script.txt");
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(Fallback),
            Box::new(TextSpeaker),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let events = Mutex::new(Vec::new());
        let err = pipeline
            .run(
                Path::new("paper.pdf"),
                &out,
                Some(&script),
                |e| events.lock().unwrap().push(e),
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert!(err.is_cancelled());
        assert!(events.into_inner().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn cancel_after_summary_skips_script_and_audio() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.txt");
        let script = dir.path().join("talk.script.txt");
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(Fallback),
            Box::new(TextSpeaker),
        );
        let cancel = CancellationToken::new();

        let err = pipeline
            .run(
                Path::new("paper.pdf"),
                &out,
                Some(&script),
                |e| {
                    if matches!(e, PipelineEvent::Summarized { .. }) {
                        cancel.cancel();
                    }
                },
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(!script.exists());
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn cancel_during_prompt_stops_summarizer() {
        let pipeline = Pipeline::new(
            Arc::new(TextBackend(PAPER)),
            Box::new(Fallback),
            Box::new(TextSpeaker),
        );
        let cancel = CancellationToken::new();
        let events = Mutex::new(Vec::new());

        let err = pipeline
            .run(
                Path::new("paper.pdf"),
                Path::new("unused.txt"),
                None,
                |e| {
                    if matches!(e, PipelineEvent::PromptBuilt { .. }) {
                        cancel.cancel();
                    }
                    events.lock().unwrap().push(e);
                },
                &cancel,
            )
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(events.into_inner().unwrap().len(), 2);
    }

    #[test]
    fn from_config_selects_backends() {
        let mut config = Config::default();
        config.llm.provider = "ollama".into();
        config.tts.provider = "elevenlabs".into();
        let pipeline = Pipeline::from_config(
            &config,
            Arc::new(TextBackend(PAPER)),
            Arc::new(crate::StaticCredentials::new()),
            reqwest::Client::new(),
            Arc::new(speech::Ffmpeg::default()),
        );
        assert_eq!(pipeline.summarizer_name(), "ollama");
        assert_eq!(pipeline.speaker_name(), "elevenlabs");
    }
}
