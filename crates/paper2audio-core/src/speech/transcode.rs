use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use super::SynthesisError;
use crate::process::{Tool, run_captured};

/// Converts one audio file into another container, chosen by the output
/// extension. Overwrites `output` if it exists.
pub trait Transcoder: Send + Sync {
    fn transcode<'a>(
        &'a self,
        input: &'a Path,
        output: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>>;
}

/// `ffmpeg -y -i <input> <output>`.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    tool: Tool,
}

impl Ffmpeg {
    pub fn new(tool: Tool) -> Self {
        Self { tool }
    }
}

impl Default for Ffmpeg {
    fn default() -> Self {
        Self::new(Tool::new("ffmpeg"))
    }
}

impl Transcoder for Ffmpeg {
    fn transcode<'a>(
        &'a self,
        input: &'a Path,
        output: &'a Path,
    ) -> Pin<Box<dyn Future<Output = Result<(), SynthesisError>> + Send + 'a>> {
        Box::pin(async move {
            let mut cmd = self.tool.command();
            cmd.arg("-y").arg("-i").arg(input).arg(output);
            run_captured(cmd, &self.tool.program).await
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_overwrite_input_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.wav");
        let output = dir.path().join("out.m4a");
        std::fs::write(&input, "RIFF").unwrap();

        // $1=-y $2=-i $3=input $4=output
        let ffmpeg = Ffmpeg::new(Tool::new("sh").with_args([
            "-c",
            r#"[ "$1" = "-y" ] && [ "$2" = "-i" ] && cp "$3" "$4""#,
            "ffmpeg",
        ]));
        ffmpeg.transcode(&input, &output).await.unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "RIFF");
    }

    #[tokio::test]
    async fn failure_surfaces_output() {
        let ffmpeg = Ffmpeg::new(
            Tool::new("sh").with_args(["-c", "echo 'Invalid data found' >&2; exit 1", "ffmpeg"]),
        );
        let err = ffmpeg
            .transcode(Path::new("in.wav"), Path::new("out.m4a"))
            .await
            .unwrap_err();
        match err {
            SynthesisError::Process { output, .. } => assert!(output.contains("Invalid data")),
            other => panic!("unexpected error: {other}"),
        }
    }
}
