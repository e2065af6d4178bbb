//! Option file loader
//!
//! Loads and merges option files from a configuration directory.

use super::{BootstrapConfig, merge};
use crate::ProvisionError;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default configuration directory
pub const CONFIG_DIR: &str = "/etc/devstack-bootstrap";

/// Main option file name
pub const MAIN_CONFIG: &str = "devstack-bootstrap.yaml";

/// Drop-in directory name
pub const CONFIG_D: &str = "devstack-bootstrap.d";

/// Load and merge option files from `config_dir`
pub async fn load_config(config_dir: impl AsRef<Path>) -> Result<BootstrapConfig, ProvisionError> {
    ConfigLoader::new(config_dir).load().await
}

/// Load a single option file as a raw YAML document
async fn load_document(path: impl AsRef<Path>) -> Result<Option<Value>, ProvisionError> {
    let path = path.as_ref();

    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok(None);
    }

    let doc = serde_yaml::from_str(&content).map_err(|e| {
        ProvisionError::Config(format!("failed to parse {}: {}", path.display(), e))
    })?;
    Ok(Some(doc))
}

/// Load all drop-in documents from a directory (sorted alphabetically)
async fn load_dropin_documents(dir: impl AsRef<Path>) -> Result<Vec<Value>, ProvisionError> {
    let dir = dir.as_ref();

    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut entries = Vec::new();
    let mut read_dir = fs::read_dir(dir).await?;
    while let Some(entry) = read_dir.next_entry().await? {
        let path = entry.path();
        if path
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            entries.push(path);
        }
    }
    entries.sort();

    let mut docs = Vec::new();
    for path in entries {
        if let Some(doc) = load_document(&path).await? {
            debug!("Loaded drop-in options from {}", path.display());
            docs.push(doc);
        }
    }

    info!("Loaded {} drop-in option files", docs.len());
    Ok(docs)
}

/// Configuration loader builder
pub struct ConfigLoader {
    config_dir: PathBuf,
    include_dropins: bool,
    overrides: Vec<String>,
}

impl ConfigLoader {
    /// Create a loader reading from `config_dir`
    pub fn new(config_dir: impl AsRef<Path>) -> Self {
        Self {
            config_dir: config_dir.as_ref().to_path_buf(),
            include_dropins: true,
            overrides: Vec::new(),
        }
    }

    /// Skip loading drop-in files
    pub fn skip_dropins(mut self) -> Self {
        self.include_dropins = false;
        self
    }

    /// Apply an inline YAML document on top of the files
    pub fn with_override(mut self, yaml: impl Into<String>) -> Self {
        self.overrides.push(yaml.into());
        self
    }

    /// Path of the main option file
    pub fn main_config(&self) -> PathBuf {
        self.config_dir.join(MAIN_CONFIG)
    }

    /// Path of the drop-in directory
    pub fn config_d(&self) -> PathBuf {
        self.config_dir.join(CONFIG_D)
    }

    /// Load and merge all documents into a configuration
    pub async fn load(self) -> Result<BootstrapConfig, ProvisionError> {
        let mut docs = Vec::new();

        if let Some(doc) = load_document(self.main_config()).await? {
            debug!("Loaded options from {}", self.main_config().display());
            docs.push(doc);
        }

        if self.include_dropins {
            docs.extend(load_dropin_documents(self.config_d()).await?);
        }

        for yaml in &self.overrides {
            if yaml.trim().is_empty() {
                continue;
            }
            docs.push(serde_yaml::from_str(yaml)?);
        }

        match merge::merge_all_documents(&docs) {
            Value::Null => Ok(BootstrapConfig::default()),
            merged => Ok(serde_yaml::from_value(merged)?),
        }
    }
}
