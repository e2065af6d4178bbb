//! Recording command runner for testing
//!
//! Records every command instead of launching it.
//!
//! # Example
//! ```
//! use devstack_bootstrap::runner::mock::RecordingRunner;
//!
//! let runner = RecordingRunner::new()
//!     .with_missing("apt-get")
//!     .with_failing("yum", 1);
//! assert!(runner.commands().is_empty());
//! ```

use super::{CommandOutput, CommandRunner, CommandSpec};
use crate::ProvisionError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Runner that records commands and answers from canned results
#[derive(Debug, Default)]
pub struct RecordingRunner {
    missing: Vec<String>,
    failing: HashMap<String, i32>,
    simulate_clones: bool,
    commands: Mutex<Vec<CommandSpec>>,
}

impl RecordingRunner {
    /// Create a runner where every command succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Treat `program` as not installed (starting it fails)
    pub fn with_missing(mut self, program: &str) -> Self {
        self.missing.push(program.to_string());
        self
    }

    /// Make `program` exit with `code`
    pub fn with_failing(mut self, program: &str, code: i32) -> Self {
        self.failing.insert(program.to_string(), code);
        self
    }

    /// Create the target directory of `git clone <url> <dir>`
    pub fn with_simulated_clones(mut self) -> Self {
        self.simulate_clones = true;
        self
    }

    /// All recorded commands in order
    pub fn commands(&self) -> Vec<CommandSpec> {
        self.commands
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    /// Recorded commands rendered as command lines
    pub fn command_lines(&self) -> Vec<String> {
        self.commands().iter().map(ToString::to_string).collect()
    }

    fn record(&self, cmd: &CommandSpec) {
        if let Ok(mut commands) = self.commands.lock() {
            commands.push(cmd.clone());
        }
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandOutput, ProvisionError> {
        self.record(cmd);

        if self.missing.contains(&cmd.program) {
            return Err(ProvisionError::Command(format!(
                "failed to start {}: No such file or directory",
                cmd.program
            )));
        }

        if let Some(code) = self.failing.get(&cmd.program) {
            return Ok(CommandOutput::failed(*code, format!("{} failed", cmd.program)));
        }

        if self.simulate_clones && cmd.program == "git" && cmd.args.first().is_some_and(|a| a == "clone") {
            if let Some(target) = cmd.args.get(2) {
                tokio::fs::create_dir_all(PathBuf::from(target)).await?;
            }
        }

        Ok(CommandOutput::ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_and_answers() {
        let runner = RecordingRunner::new()
            .with_missing("apt-get")
            .with_failing("yum", 2);

        assert!(runner.run(&CommandSpec::new("apt-get")).await.is_err());
        let output = runner.run(&CommandSpec::new("yum")).await.unwrap();
        assert_eq!(output.code, Some(2));
        assert!(runner.run(&CommandSpec::new("git")).await.unwrap().success());

        assert_eq!(runner.command_lines(), vec!["apt-get", "yum", "git"]);
    }
}
