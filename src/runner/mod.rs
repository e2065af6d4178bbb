//! External command execution
//!
//! Every program the provisioner launches (package managers, git, stack.sh)
//! goes through a [`CommandRunner`], so the procedure can be driven against
//! a recording runner in tests.

pub mod mock;

use crate::ProvisionError;
use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

/// A command to launch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Successful empty output
    pub fn ok() -> Self {
        Self {
            code: Some(0),
            ..Default::default()
        }
    }

    /// Failed output with the given code and stderr
    pub fn failed(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Launches external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion
    ///
    /// Returns `Err` only when the program could not be started; a non-zero
    /// exit is reported through [`CommandOutput`].
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ProvisionError>;

    /// Run a command and fail on a non-zero exit
    async fn run_checked(&self, cmd: &CommandSpec) -> Result<CommandOutput, ProvisionError> {
        let output = self.run(cmd).await?;
        if !output.success() {
            return Err(ProvisionError::Command(format!(
                "`{}` exited with status {}: {}",
                cmd,
                output.code.unwrap_or(-1),
                output.stderr.trim()
            )));
        }
        Ok(output)
    }
}

/// Runs commands on the local system via tokio
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ProvisionError> {
        debug!("Running command: {}", cmd);

        let mut command = tokio::process::Command::new(&cmd.program);
        command.args(&cmd.args);
        for (key, value) in &cmd.env {
            command.env(key, value);
        }
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        let output = command
            .output()
            .await
            .map_err(|e| ProvisionError::Command(format!("failed to start {}: {}", cmd.program, e)))?;

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.stdout.is_empty() {
            debug!("stdout: {}", result.stdout);
        }

        Ok(result)
    }
}
