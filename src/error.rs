//! Error types for devstack-bootstrap

use thiserror::Error;

/// Main error type for provisioning operations
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Template error: {0}")]
    Template(String),

    #[error("Step '{step}' failed: {message}")]
    Step { step: String, message: String },

    #[error("Command execution failed: {0}")]
    Command(String),

    #[error("No usable package manager (tried: {})", .attempts.join("; "))]
    NoPackageManager { attempts: Vec<String> },
}

impl ProvisionError {
    /// Create a step error
    pub fn step(step: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Step {
            step: step.into(),
            message: message.into(),
        }
    }
}

impl From<minijinja::Error> for ProvisionError {
    fn from(e: minijinja::Error) -> Self {
        Self::Template(e.to_string())
    }
}
