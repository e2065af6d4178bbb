//! Template rendering
//!
//! Produces the artifacts that leave the process: the Ruby option file for
//! the VM orchestrator, the equivalent shell provisioner, and the refresh
//! launcher installed in the guest.

pub mod context;
pub mod templates;

pub use context::build_context;

use crate::ProvisionError;
use crate::config::BootstrapConfig;
use minijinja::{Environment, Value};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Quote a string for POSIX shells
pub fn shell_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "/._-+:=@,".contains(c))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', r"'\''"))
}

/// Quote a string as a Ruby double-quoted literal
pub fn ruby_quote(value: &str) -> String {
    let escaped = value
        .replace('\\', r"\\")
        .replace('"', "\\\"")
        .replace("#{", "\\#{");
    format!("\"{}\"", escaped)
}

/// Template renderer with the built-in filters registered
pub struct TemplateRenderer {
    env: Environment<'static>,
    context: HashMap<String, Value>,
}

impl TemplateRenderer {
    /// Create a renderer with an empty context
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.add_filter("shquote", |value: String| shell_quote(&value));
        env.add_filter("rbquote", |value: String| ruby_quote(&value));

        Self {
            env,
            context: HashMap::new(),
        }
    }

    /// Create with the context of a configuration
    pub fn with_config(config: &BootstrapConfig) -> Self {
        let mut renderer = Self::new();
        renderer.context = build_context(config);
        renderer
    }

    /// Add a variable to the context
    pub fn add_var(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.context.insert(name.into(), value.into());
    }

    /// Render a template string
    pub fn render(&self, template: &str) -> Result<String, ProvisionError> {
        debug!("Rendering template");
        Ok(self.env.render_str(template, &self.context)?)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Render the Vagrant option file
pub fn render_vagrant_config(config: &BootstrapConfig) -> Result<String, ProvisionError> {
    TemplateRenderer::with_config(config).render(templates::VAGRANT_CONFIG)
}

/// Render the shell provisioner
pub fn render_shell_provisioner(config: &BootstrapConfig) -> Result<String, ProvisionError> {
    TemplateRenderer::with_config(config).render(templates::SHELL_PROVISIONER)
}

/// Render the refresh launcher that re-invokes `binary`
pub fn render_launcher(binary: &Path, config_dir: &Path) -> Result<String, ProvisionError> {
    let mut renderer = TemplateRenderer::new();
    renderer.add_var("binary", binary.to_string_lossy().into_owned());
    renderer.add_var("config_dir", config_dir.to_string_lossy().into_owned());
    renderer.render(templates::REFRESH_LAUNCHER)
}
