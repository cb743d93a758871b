use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    ScratchPath, Speaker, SynthesisError, Transcoder, deliver, with_appended_extension,
    write_scratch_text,
};
use crate::process::{Tool, run_captured};
use crate::until_cancelled;

const NATIVE_EXT: &str = "wav";

/// Local offline engine. Needs a voice model and its JSON metadata.
pub struct Piper {
    tool: Tool,
    voice: Option<PathBuf>,
    voice_json: Option<PathBuf>,
    transcoder: Arc<dyn Transcoder>,
}

impl Piper {
    pub fn new(
        tool: Tool,
        voice: Option<PathBuf>,
        voice_json: Option<PathBuf>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        Self {
            tool,
            voice,
            voice_json,
            transcoder,
        }
    }

    async fn render(&self, text: &str, out_path: &Path) -> Result<(), SynthesisError> {
        let voice = self
            .voice
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SynthesisError::MissingResource {
                backend: "piper",
                what: "voice model path",
            })?;
        let voice_json = self
            .voice_json
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(SynthesisError::MissingResource {
                backend: "piper",
                what: "voice metadata (.json) path",
            })?;

        let scratch = write_scratch_text(out_path, text)?;
        let stdin = scratch.reopen()?;
        let wav = ScratchPath::new(with_appended_extension(out_path, NATIVE_EXT));

        let mut cmd = self.tool.command();
        cmd.arg("-m")
            .arg(voice)
            .arg("-c")
            .arg(voice_json)
            .arg("-f")
            .arg(wav.path())
            .arg("-q")
            .stdin(stdin);

        tracing::debug!(voice = %voice.display(), wav = %wav.path().display(), "running piper");
        run_captured(cmd, &self.tool.program).await?;
        drop(scratch);

        deliver(wav, NATIVE_EXT, out_path, self.transcoder.as_ref()).await
    }
}

impl Speaker for Piper {
    fn name(&self) -> &str {
        "piper"
    }

    fn speak<'a>(
        &'a self,
        text: &'a str,
        out_path: &'a Path,
        cancel: &'a CancellationToken,
    ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>> {
        Box::pin(until_cancelled(
            cancel,
            SynthesisError::Cancelled,
            self.render(text, out_path),
        ))
    }
}
