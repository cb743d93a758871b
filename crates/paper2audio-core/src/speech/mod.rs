//! Speech backends: turn narration text into an audio file on disk.

pub mod elevenlabs;
pub mod openai;
pub mod piper;
pub mod say;
pub mod transcode;

use std::ffi::OsString;
use std::future::Future;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use futures_util::StreamExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::credentials::CredentialProvider;
use crate::{ToolsConfig, TtsConfig};

pub use elevenlabs::ElevenLabs;
pub use openai::OpenAiSpeech;
pub use piper::Piper;
pub use say::Say;
pub use transcode::{Ffmpeg, Transcoder};

#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("{backend}: missing {what}")]
    MissingResource {
        backend: &'static str,
        what: &'static str,
    },
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
    #[error("{program}: {status}: {output}")]
    Process {
        program: String,
        status: String,
        output: String,
    },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("speech synthesis cancelled")]
    Cancelled,
}

/// A backend that renders narration text to an audio file.
pub trait Speaker: Send + Sync {
    /// Provider name used in logs and progress output.
    fn name(&self) -> &str;

    /// Write audio for `text` to `out_path`. The container format follows
    /// the extension of `out_path`.
    fn speak<'a>(
        &'a self,
        text: &'a str,
        out_path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>>;
}

/// Closed set of speech variants, keyed by provider name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechProvider {
    Piper,
    Say,
    OpenAi,
    ElevenLabs,
}

impl SpeechProvider {
    /// Resolve a configured provider name. Empty or unknown names select the
    /// OS built-in synthesizer.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "piper" => SpeechProvider::Piper,
            "openai" => SpeechProvider::OpenAi,
            "elevenlabs" | "eleven" => SpeechProvider::ElevenLabs,
            _ => SpeechProvider::Say,
        }
    }
}

/// Build the speaker selected by `config.provider`.
pub fn build_speaker(
    config: &TtsConfig,
    tools: &ToolsConfig,
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
    transcoder: Arc<dyn Transcoder>,
) -> Box<dyn Speaker> {
    match SpeechProvider::from_name(&config.provider) {
        SpeechProvider::Piper => Box::new(Piper::new(
            tools.piper.clone(),
            config.piper_voice.clone(),
            config.piper_voice_json.clone(),
            transcoder,
        )),
        SpeechProvider::Say => Box::new(
            Say::new(tools.say.clone(), transcoder).with_voice(config.say_voice.clone()),
        ),
        SpeechProvider::OpenAi => Box::new(OpenAiSpeech::new(
            &config.openai_voice,
            &config.openai_model,
            &config.openai_base_url,
            client,
            credentials,
        )),
        SpeechProvider::ElevenLabs => Box::new(ElevenLabs::new(
            &config.eleven_voice,
            &config.eleven_base_url,
            client,
            credentials,
        )),
    }
}

/// `value` trimmed, or `default` when that leaves nothing.
pub(crate) fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Case-insensitive extension check.
pub fn has_extension(path: &Path, ext: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// `<out_path>.<ext>`, e.g. `talk.m4a` -> `talk.m4a.wav`.
pub(crate) fn with_appended_extension(out_path: &Path, ext: &str) -> PathBuf {
    let mut s: OsString = out_path.as_os_str().to_owned();
    s.push(".");
    s.push(ext);
    PathBuf::from(s)
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

/// A file path removed on drop unless [`ScratchPath::disarm`] was called.
///
/// Covers success, error, and cancellation (future dropped) alike. Removal
/// failures are logged and otherwise ignored.
#[derive(Debug)]
pub(crate) struct ScratchPath {
    path: PathBuf,
    armed: bool,
}

impl ScratchPath {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path, armed: true }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for ScratchPath {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to remove scratch file");
        }
    }
}

/// Write `text` to a scratch file next to `out_path`, removed on drop.
pub(crate) fn write_scratch_text(
    out_path: &Path,
    text: &str,
) -> Result<tempfile::NamedTempFile, SynthesisError> {
    let mut scratch = tempfile::Builder::new()
        .prefix(".paper2audio-")
        .suffix(".txt")
        .tempfile_in(parent_dir(out_path))?;
    scratch.write_all(text.as_bytes())?;
    scratch.flush()?;
    Ok(scratch)
}

/// Move a finished native-format file into place at `out_path`, going
/// through `transcoder` when the requested extension differs from
/// `native_ext`. The intermediate is removed either way.
pub(crate) async fn deliver(
    mut intermediate: ScratchPath,
    native_ext: &str,
    out_path: &Path,
    transcoder: &dyn Transcoder,
) -> Result<(), SynthesisError> {
    if has_extension(out_path, native_ext) {
        std::fs::rename(intermediate.path(), out_path)?;
        intermediate.disarm();
        return Ok(());
    }

    // Transcode beside the destination and rename over it only on success.
    let file_name = out_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    let mut partial = ScratchPath::new(parent_dir(out_path).join(format!(".partial-{file_name}")));

    tracing::debug!(
        from = %intermediate.path().display(),
        to = %out_path.display(),
        "transcoding"
    );
    transcoder.transcode(intermediate.path(), partial.path()).await?;
    std::fs::rename(partial.path(), out_path)?;
    partial.disarm();
    Ok(())
}

/// Fail with the response body when the status is not 200.
pub(crate) async fn ensure_ok(
    resp: reqwest::Response,
    backend: &'static str,
) -> Result<reqwest::Response, SynthesisError> {
    let status = resp.status();
    if status != reqwest::StatusCode::OK {
        let body = resp.text().await.unwrap_or_default();
        return Err(SynthesisError::Status {
            backend,
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp)
}

/// Stream a response body into a temporary file beside `out_path` and
/// rename it into place once the body is complete.
pub(crate) async fn write_body_atomically(
    resp: reqwest::Response,
    out_path: &Path,
) -> Result<u64, SynthesisError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".paper2audio-")
        .suffix(".part")
        .tempfile_in(parent_dir(out_path))?;

    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        tmp.write_all(&chunk)?;
        written += chunk.len() as u64;
    }
    tmp.flush()?;
    tmp.persist(out_path).map_err(|e| SynthesisError::Io(e.error))?;
    Ok(written)
}
