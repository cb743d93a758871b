use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{
    ScratchPath, Speaker, SynthesisError, Transcoder, deliver, with_appended_extension,
    write_scratch_text,
};
use crate::process::{Tool, run_captured};
use crate::until_cancelled;

const NATIVE_EXT: &str = "aiff";

/// The OS built-in synthesizer (`say` on macOS).
pub struct Say {
    tool: Tool,
    voice: Option<String>,
    transcoder: Arc<dyn Transcoder>,
}

impl Say {
    pub fn new(tool: Tool, transcoder: Arc<dyn Transcoder>) -> Self {
        Self {
            tool,
            voice: None,
            transcoder,
        }
    }

    pub fn with_voice(mut self, voice: Option<String>) -> Self {
        self.voice = voice.filter(|v| !v.trim().is_empty());
        self
    }

    async fn render(&self, text: &str, out_path: &Path) -> Result<(), SynthesisError> {
        let scratch = write_scratch_text(out_path, text)?;
        let aiff = ScratchPath::new(with_appended_extension(out_path, NATIVE_EXT));

        let mut cmd = self.tool.command();
        if let Some(voice) = &self.voice {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("-o").arg(aiff.path()).arg("-f").arg(scratch.path());

        tracing::debug!(aiff = %aiff.path().display(), "running say");
        run_captured(cmd, &self.tool.program).await?;
        drop(scratch);

        deliver(aiff, NATIVE_EXT, out_path, self.transcoder.as_ref()).await
    }
}

impl Speaker for Say {
    fn name(&self) -> &str {
        "say"
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

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Copies the text file to the `-o` target: $1=-o $2=aiff $3=-f $4=text.
    fn stub_say() -> Tool {
        Tool::new("sh").with_args([
            "-c",
            r#"[ "$1" = "-o" ] && [ "$3" = "-f" ] && cp "$4" "$2""#,
            "say",
        ])
    }

    /// Marks the output so transcoding is observable.
    struct TaggingTranscoder;

    impl Transcoder for TaggingTranscoder {
        fn transcode<'a>(
            &'a self,
            input: &'a Path,
            output: &'a Path,
        ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>> {
            Box::pin(async move {
                let body = std::fs::read_to_string(input)?;
                std::fs::write(output, format!("m4a:{body}"))?;
                Ok(())
            })
        }
    }

    fn listing(dir: &Path) -> Vec<String> {
        let mut names: Vec<_> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn aiff_output_is_renamed_into_place() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.AIFF");
        Say::new(stub_say(), Arc::new(TaggingTranscoder))
            .speak("hello there", &out, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hello there");
        assert_eq!(listing(dir.path()), ["talk.AIFF"]);
    }

    #[tokio::test]
    async fn other_extensions_are_transcoded() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.m4a");
        Say::new(stub_say(), Arc::new(TaggingTranscoder))
            .speak("hello", &out, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "m4a:hello");
        assert_eq!(listing(dir.path()), ["talk.m4a"]);
    }

    #[tokio::test]
    async fn voice_precedes_output_args() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.aiff");
        let tool = Tool::new("sh").with_args([
            "-c",
            r#"[ "$1" = "-v" ] && [ "$2" = "Samantha" ] && cp "$6" "$4""#,
            "say",
        ]);
        Say::new(tool, Arc::new(TaggingTranscoder))
            .with_voice(Some("Samantha".into()))
            .speak("hi", &out, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "hi");
    }

    #[tokio::test]
    async fn cancellation_kills_process_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("talk.m4a");
        let tool = Tool::new("sh").with_args(["-c", r#"touch "$2"; sleep 30"#, "say"]);
        let say = Say::new(tool, Arc::new(TaggingTranscoder));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(200)).await;
            trigger.cancel();
        });

        let err = say.speak("x", &out, &cancel).await.unwrap_err();
        assert!(matches!(err, SynthesisError::Cancelled));
        assert!(listing(dir.path()).is_empty());
    }
}
