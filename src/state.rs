//! Run status tracking
//!
//! A small JSON record under the guest home directory tells whether the
//! last provision or refresh finished. A record still marked `running` at
//! start-up means the previous run was interrupted; the new run logs that
//! and simply re-executes every step, since each one converges.

use crate::ProvisionError;
use crate::provision::files;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    NotStarted,
    Running,
    Done,
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not-started"),
            Self::Running => write!(f, "running"),
            Self::Done => write!(f, "done"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Status of the last run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub status: RunState,
    /// Subcommand that produced this record (provision, refresh)
    pub command: Option<String>,
    /// Seconds since the epoch
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    #[serde(default)]
    pub completed_steps: Vec<String>,
    pub error: Option<String>,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self {
            status: RunState::NotStarted,
            command: None,
            started_at: None,
            finished_at: None,
            completed_steps: Vec::new(),
            error: None,
        }
    }
}

/// Reads and writes the status record
#[derive(Debug, Clone)]
pub struct StatusFile {
    path: PathBuf,
}

impl StatusFile {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current status (default when no record exists)
    pub async fn read(&self) -> Result<RunStatus, ProvisionError> {
        if !fs::try_exists(&self.path).await? {
            return Ok(RunStatus::default());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write a status record through a temp file so a crash never truncates it
    pub async fn write(&self, status: &RunStatus) -> Result<(), ProvisionError> {
        let json = serde_json::to_string_pretty(status)?;
        files::write_atomic(&self.path, &json).await?;
        debug!("Updated status: {}", status.status);
        Ok(())
    }

    /// Start a run, reporting whether the previous one was interrupted
    pub async fn begin(&self, command: &str) -> Result<bool, ProvisionError> {
        let previous = match self.read().await {
            Ok(previous) => previous,
            Err(e) => {
                // an unreadable record can only come from a run that died mid-write
                warn!(
                    "Status record {} is unreadable ({}); treating the previous run as interrupted",
                    self.path.display(),
                    e
                );
                RunStatus {
                    status: RunState::Running,
                    ..Default::default()
                }
            }
        };
        let interrupted = previous.status == RunState::Running;
        if interrupted {
            warn!(
                "Previous {} run did not finish (last completed step: {}); re-running all steps",
                previous.command.as_deref().unwrap_or("unknown"),
                previous
                    .completed_steps
                    .last()
                    .map(String::as_str)
                    .unwrap_or("none")
            );
        }

        self.write(&RunStatus {
            status: RunState::Running,
            command: Some(command.to_string()),
            started_at: Some(timestamp()),
            ..Default::default()
        })
        .await?;
        Ok(interrupted)
    }

    /// Record a completed step
    pub async fn step_done(&self, step: &str) -> Result<(), ProvisionError> {
        let mut status = self.read().await?;
        status.completed_steps.push(step.to_string());
        self.write(&status).await
    }

    /// Finish the run with its outcome
    pub async fn finish(&self, error: Option<&ProvisionError>) -> Result<(), ProvisionError> {
        let mut status = self.read().await?;
        status.finished_at = Some(timestamp());
        match error {
            Some(e) => {
                status.status = RunState::Failed;
                status.error = Some(e.to_string());
            }
            None => status.status = RunState::Done,
        }
        self.write(&status).await
    }
}

fn timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
