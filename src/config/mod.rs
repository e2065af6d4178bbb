//! VM and guest configuration
//!
//! Options are read once from YAML and never mutated afterwards. The VM
//! options are consumed by the orchestrator on the host; the `guest`
//! section drives provisioning inside the VM.

pub mod loader;
pub mod merge;

pub use loader::{ConfigLoader, load_config};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default Ubuntu box image
pub const DEFAULT_UBUNTU_BOX: &str = "sputnik13/trusty64";

/// Default Fedora box image
pub const DEFAULT_FEDORA_BOX: &str = "box-cutter/fedora20";

/// Default VM memory in MiB
pub const DEFAULT_VM_MEMORY: u32 = 8192;

/// Default VM CPU count
pub const DEFAULT_VM_CPUS: u32 = 2;

/// Resolved bootstrap configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Explicit guest hostname
    pub hostname: Option<String>,

    /// Guest port => host port mappings
    pub forwarded_port: BTreeMap<u16, u16>,

    /// Box image for Ubuntu guests
    pub ubuntu_box: String,

    /// Box image for Fedora guests
    pub fedora_box: String,

    /// Proxy used for package downloads
    pub package_proxy: Option<String>,

    /// Run stack.sh once provisioning is done
    pub install_devstack: bool,

    /// Install compiler toolchain and headers
    pub install_build_deps: bool,

    /// Install tmate for shared terminal sessions
    pub install_tmate: bool,

    /// Clone rally into the guest home
    pub install_rally: bool,

    /// RAM configured for the VM (MiB)
    pub vm_memory: u32,

    /// CPU cores configured for the VM
    pub vm_cpus: u32,

    /// Guest-side layout and sources
    pub guest: GuestConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            forwarded_port: BTreeMap::new(),
            ubuntu_box: DEFAULT_UBUNTU_BOX.to_string(),
            fedora_box: DEFAULT_FEDORA_BOX.to_string(),
            package_proxy: None,
            install_devstack: false,
            install_build_deps: true,
            install_tmate: false,
            install_rally: true,
            vm_memory: DEFAULT_VM_MEMORY,
            vm_cpus: DEFAULT_VM_CPUS,
            guest: GuestConfig::default(),
        }
    }
}

/// Guest-side configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestConfig {
    /// Login user inside the guest
    pub user: String,

    /// Home directory; defaults to /home/<user>
    pub home: Option<String>,

    /// Directory devstack installs services into
    pub stack_dir: String,

    /// Project synchronized into the stack directory
    pub project: String,

    /// Client/dashboard checkouts synced when present
    pub siblings: Vec<String>,

    /// devstack repository URL
    pub devstack_repo: String,

    /// rally repository URL
    pub rally_repo: String,

    /// Content written to ~/.gitconfig
    pub gitconfig: Option<String>,

    /// Prefix package manager calls with `sudo -E`
    pub sudo: bool,
}

impl Default for GuestConfig {
    fn default() -> Self {
        Self {
            user: "vagrant".to_string(),
            home: None,
            stack_dir: "/opt/stack".to_string(),
            project: "cue".to_string(),
            siblings: vec!["python-cueclient".to_string(), "cue-dashboard".to_string()],
            devstack_repo: "https://git.openstack.org/openstack-dev/devstack".to_string(),
            rally_repo: "https://git.openstack.org/openstack/rally".to_string(),
            gitconfig: None,
            sudo: true,
        }
    }
}

impl GuestConfig {
    /// Resolved home directory
    pub fn home_dir(&self) -> String {
        self.home
            .clone()
            .unwrap_or_else(|| format!("/home/{}", self.user))
    }
}

impl BootstrapConfig {
    /// Parse a configuration from YAML, filling unset options with defaults
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    /// Extra packages requested by the feature toggles
    pub fn extra_packages(&self) -> Vec<&'static str> {
        let mut packages = Vec::new();
        if self.install_tmate {
            packages.push("tmate");
        }
        packages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BootstrapConfig::default();
        assert_eq!(config.hostname, None);
        assert!(config.forwarded_port.is_empty());
        assert_eq!(config.ubuntu_box, "sputnik13/trusty64");
        assert_eq!(config.fedora_box, "box-cutter/fedora20");
        assert_eq!(config.package_proxy, None);
        assert!(!config.install_devstack);
        assert!(config.install_build_deps);
        assert!(!config.install_tmate);
        assert!(config.install_rally);
        assert_eq!(config.vm_memory, 8192);
        assert_eq!(config.vm_cpus, 2);
        assert_eq!(config.guest.home_dir(), "/home/vagrant");
        assert_eq!(config.guest.stack_dir, "/opt/stack");
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
hostname: dev
vm_memory: 4096
forwarded_port:
  8795: 8795
  80: 8080
guest:
  user: stack
"#;
        let config = BootstrapConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.hostname.as_deref(), Some("dev"));
        assert_eq!(config.vm_memory, 4096);
        assert_eq!(config.vm_cpus, 2);
        assert_eq!(config.forwarded_port.get(&80), Some(&8080));
        assert_eq!(config.guest.home_dir(), "/home/stack");
        assert_eq!(config.guest.project, "cue");
    }

    #[test]
    fn test_empty_yaml() {
        let config = BootstrapConfig::from_yaml("  \n").unwrap();
        assert_eq!(config, BootstrapConfig::default());
    }

    #[test]
    fn test_extra_packages() {
        let mut config = BootstrapConfig::default();
        assert!(config.extra_packages().is_empty());
        config.install_tmate = true;
        assert_eq!(config.extra_packages(), vec!["tmate"]);
    }
}
