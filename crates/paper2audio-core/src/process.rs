//! External program invocation for the local speech engines and transcoder.

use std::process::Stdio;

use tokio::process::Command;

use crate::speech::SynthesisError;

/// An external program plus any arguments that precede the per-call ones.
///
/// Leading arguments let a wrapper stand in for the real binary, e.g.
/// `Tool::new("sh").with_args(["-c", script, "stub"])`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tool {
    pub program: String,
    pub args: Vec<String>,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// A command for this tool. The child is killed if the handle is
    /// dropped, which is how cancellation reaches running processes.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).kill_on_drop(true);
        cmd
    }
}

/// Run `cmd` to completion, failing with its combined output on a
/// non-zero exit.
pub async fn run_captured(mut cmd: Command, program: &str) -> Result<(), SynthesisError> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    tracing::debug!(program, "running external tool");

    let output = cmd.output().await.map_err(|source| SynthesisError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        return Err(SynthesisError::Process {
            program: program.to_string(),
            status: output.status.to_string(),
            output: combined.trim().to_string(),
        });
    }
    Ok(())
}
