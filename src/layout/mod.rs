//! Guest filesystem layout
//!
//! Defines where sources, the devstack checkout and the stack directory
//! live inside the guest.

use crate::config::BootstrapConfig;
use std::path::{Path, PathBuf};

/// Directory names never copied into the stack directory
pub const SYNC_EXCLUDES: &[&str] = &[".tox", ".venv", ".vagrant"];

/// Extra exclusion for sibling checkouts
pub const SIBLING_EXCLUDES: &[&str] = &["contrib/vagrant"];

/// Sample config files installed into devstack when absent
pub const CONFIG_SAMPLES: &[&str] = &["local.conf", "local.sh"];

/// Name of the refresh launcher placed in ~/bin
pub const REFRESH_SCRIPT: &str = "refresh_devstack.sh";

/// Guest paths
#[derive(Debug, Clone)]
pub struct GuestPaths {
    /// Guest user's home (default: /home/vagrant)
    pub home: PathBuf,
    /// Service install location (default: /opt/stack)
    pub stack_dir: PathBuf,
    /// Main project name (default: cue)
    pub project: String,
}

impl GuestPaths {
    /// Create with explicit directories
    pub fn new(home: impl AsRef<Path>, stack_dir: impl AsRef<Path>, project: impl Into<String>) -> Self {
        Self {
            home: home.as_ref().to_path_buf(),
            stack_dir: stack_dir.as_ref().to_path_buf(),
            project: project.into(),
        }
    }

    /// Derive the layout from a configuration
    pub fn from_config(config: &BootstrapConfig) -> Self {
        Self::new(
            config.guest.home_dir(),
            &config.guest.stack_dir,
            config.guest.project.clone(),
        )
    }

    // ==================== Home Directory ====================

    /// ~/devstack - devstack checkout
    pub fn devstack_dir(&self) -> PathBuf {
        self.home.join("devstack")
    }

    /// ~/rally - rally checkout
    pub fn rally_dir(&self) -> PathBuf {
        self.home.join("rally")
    }

    /// ~/bin
    pub fn bin_dir(&self) -> PathBuf {
        self.home.join("bin")
    }

    /// ~/bin/refresh_devstack.sh
    pub fn refresh_script(&self) -> PathBuf {
        self.bin_dir().join(REFRESH_SCRIPT)
    }

    /// ~/.bash_aliases
    pub fn bash_aliases(&self) -> PathBuf {
        self.home.join(".bash_aliases")
    }

    /// ~/.gitconfig
    pub fn gitconfig(&self) -> PathBuf {
        self.home.join(".gitconfig")
    }

    /// ~/.devstack-bootstrap/status.json - last run status
    pub fn status_file(&self) -> PathBuf {
        self.home.join(".devstack-bootstrap").join("status.json")
    }

    /// ~/<name> - a checkout in the home directory
    pub fn source_dir(&self, name: &str) -> PathBuf {
        self.home.join(name)
    }

    // ==================== Project Paths ====================

    /// ~/<project>/devstack/lib - plugin files in the working tree
    pub fn plugin_source_dir(&self) -> PathBuf {
        self.source_dir(&self.project).join("devstack").join("lib")
    }

    /// /opt/stack/<project> - synchronized copy
    pub fn stack_project(&self) -> PathBuf {
        self.stack_dir.join(&self.project)
    }

    /// /opt/stack/<project>/devstack - devstack plugin directory of the copy
    pub fn stack_plugin_dir(&self) -> PathBuf {
        self.stack_project().join("devstack")
    }

    /// ~/devstack/lib
    pub fn devstack_lib(&self) -> PathBuf {
        self.devstack_dir().join("lib")
    }
}

/// Shell aliases registered in ~/.bash_aliases
pub fn alias_lines(paths: &GuestPaths) -> Vec<String> {
    let project = &paths.project;
    vec![
        format!(
            "alias refresh_devstack=\"{}\"",
            paths.refresh_script().display()
        ),
        format!(
            r#"alias delete_ports="neutron port-list | egrep '.+_{project}\[.+\]\.node\[.+\]' | tr -d ' ' | cut -f 2 -d '|' | xargs -n1 neutron port-delete""#
        ),
        format!(
            r#"alias delete_clusters="openstack {project} cluster list | grep rally | tr -d ' ' | cut -f 2 -d '|' | xargs -n1 openstack {project} cluster delete""#
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let paths = GuestPaths::from_config(&BootstrapConfig::default());
        assert_eq!(paths.home, PathBuf::from("/home/vagrant"));
        assert_eq!(paths.devstack_dir(), PathBuf::from("/home/vagrant/devstack"));
        assert_eq!(
            paths.refresh_script(),
            PathBuf::from("/home/vagrant/bin/refresh_devstack.sh")
        );
        assert_eq!(paths.bash_aliases(), PathBuf::from("/home/vagrant/.bash_aliases"));
    }

    #[test]
    fn test_project_paths() {
        let paths = GuestPaths::new("/home/vagrant", "/opt/stack", "cue");
        assert_eq!(
            paths.plugin_source_dir(),
            PathBuf::from("/home/vagrant/cue/devstack/lib")
        );
        assert_eq!(paths.stack_project(), PathBuf::from("/opt/stack/cue"));
        assert_eq!(
            paths.stack_plugin_dir(),
            PathBuf::from("/opt/stack/cue/devstack")
        );
        assert_eq!(paths.devstack_lib(), PathBuf::from("/home/vagrant/devstack/lib"));
    }

    #[test]
    fn test_alias_lines() {
        let paths = GuestPaths::new("/home/vagrant", "/opt/stack", "cue");
        let lines = alias_lines(&paths);
        assert_eq!(
            lines[0],
            "alias refresh_devstack=\"/home/vagrant/bin/refresh_devstack.sh\""
        );
        assert!(lines[1].contains(r"_cue\[.+\]\.node"));
        assert!(lines[2].contains("openstack cue cluster delete"));
    }
}
