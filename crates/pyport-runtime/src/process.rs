use crate::RuntimeError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Captured output of a successful subprocess.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs interpreter and pip subprocesses.
///
/// A non-zero exit status is always an error (`RuntimeError::CommandFailed`).
pub trait ProcessRunner: Send + Sync {
    /// Run to completion with stdout and stderr captured.
    fn capture(&self, program: &Path, args: &[String]) -> Result<CommandOutput, RuntimeError>;

    /// Run to completion with the child's output shown to the user.
    fn stream(&self, program: &Path, args: &[String]) -> Result<(), RuntimeError>;
}

/// `ProcessRunner` backed by `std::process::Command`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner {
    stdout_to_stderr: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Send streamed children's stdout to our stderr, keeping stdout free
    /// for machine-readable output.
    #[must_use]
    pub fn stdout_to_stderr(mut self, enabled: bool) -> Self {
        self.stdout_to_stderr = enabled;
        self
    }
}

pub fn display_command(program: &Path, args: &[String]) -> String {
    if args.is_empty() {
        program.display().to_string()
    } else {
        format!("{} {}", program.display(), args.join(" "))
    }
}

impl ProcessRunner for SystemRunner {
    fn capture(&self, program: &Path, args: &[String]) -> Result<CommandOutput, RuntimeError> {
        let command = display_command(program, args);
        tracing::debug!("run (captured): {command}");
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        if !output.status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                status: output.status.to_string(),
                stderr: stderr.trim().to_owned(),
            });
        }
        Ok(CommandOutput { stdout, stderr })
    }

    fn stream(&self, program: &Path, args: &[String]) -> Result<(), RuntimeError> {
        let command = display_command(program, args);
        tracing::debug!("run: {command}");
        let mut cmd = Command::new(program);
        cmd.args(args).stdin(Stdio::null());
        if self.stdout_to_stderr {
            cmd.stdout(Stdio::from(std::io::stderr()));
        }
        let status = cmd
            .status()
            .map_err(|source| RuntimeError::Spawn {
                command: command.clone(),
                source,
            })?;
        if !status.success() {
            return Err(RuntimeError::CommandFailed {
                command,
                status: status.to_string(),
                stderr: String::new(),
            });
        }
        Ok(())
    }
}
