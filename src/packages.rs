//! Package installation
//!
//! Package managers are tried in order (apt, then yum). The first one whose
//! index update and install both succeed wins; failures of the others are
//! tolerated and only logged.

use crate::ProvisionError;
use crate::runner::{CommandRunner, CommandSpec};
use tracing::{debug, info, warn};

/// One way of installing packages on the guest
pub trait PackageStrategy: Send + Sync {
    /// Name used in logs and errors
    fn name(&self) -> &'static str;

    /// Command refreshing the package index
    fn update_command(&self) -> CommandSpec;

    /// Command installing `packages`
    fn install_command(&self, packages: &[String]) -> CommandSpec;

    /// Packages needed to build the project's native dependencies
    fn build_deps(&self) -> &'static [&'static str];
}

/// Supported package managers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Yum,
}

impl PackageStrategy for PackageManager {
    fn name(&self) -> &'static str {
        match self {
            Self::Apt => "apt-get",
            Self::Yum => "yum",
        }
    }

    fn update_command(&self) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("apt-get")
                .args(["-qqy", "update"])
                .env("DEBIAN_FRONTEND", "noninteractive"),
            Self::Yum => CommandSpec::new("yum").args(["-q", "-y", "makecache"]),
        }
    }

    fn install_command(&self, packages: &[String]) -> CommandSpec {
        match self {
            Self::Apt => CommandSpec::new("apt-get")
                .args(["install", "-qqy"])
                .args(packages.iter().cloned())
                .env("DEBIAN_FRONTEND", "noninteractive"),
            Self::Yum => CommandSpec::new("yum")
                .args(["install", "-q", "-y"])
                .args(packages.iter().cloned()),
        }
    }

    fn build_deps(&self) -> &'static [&'static str] {
        match self {
            Self::Apt => &["build-essential", "python-dev", "libffi-dev", "libssl-dev"],
            Self::Yum => &["gcc", "python-devel", "libffi-devel", "openssl-devel"],
        }
    }
}

/// Default strategy order
pub fn default_strategies() -> Vec<Box<dyn PackageStrategy>> {
    vec![Box::new(PackageManager::Apt), Box::new(PackageManager::Yum)]
}

/// Package installation request
#[derive(Debug, Clone, Default)]
pub struct PackageRequest {
    /// Packages every strategy installs
    pub packages: Vec<String>,
    /// Also install the strategy's build dependencies
    pub build_deps: bool,
    /// Proxy exported to the package manager
    pub proxy: Option<String>,
    /// Run the package manager through `sudo -E`
    pub sudo: bool,
}

impl PackageRequest {
    /// Full package list for a strategy
    fn packages_for(&self, strategy: &dyn PackageStrategy) -> Vec<String> {
        let mut packages = self.packages.clone();
        if self.build_deps {
            for dep in strategy.build_deps() {
                if !packages.iter().any(|p| p == dep) {
                    packages.push(dep.to_string());
                }
            }
        }
        packages
    }

    /// Apply proxy and privilege settings to a strategy command
    fn prepare(&self, mut cmd: CommandSpec) -> CommandSpec {
        if let Some(proxy) = &self.proxy {
            cmd = cmd
                .env("http_proxy", proxy.as_str())
                .env("https_proxy", proxy.as_str());
        }
        if self.sudo {
            let mut args = vec!["-E".to_string(), cmd.program];
            args.append(&mut cmd.args);
            cmd.program = "sudo".to_string();
            cmd.args = args;
        }
        cmd
    }
}

/// Update the index and install packages with the first working strategy
///
/// Returns the name of the strategy that succeeded.
pub async fn install_with_fallback(
    runner: &dyn CommandRunner,
    strategies: &[Box<dyn PackageStrategy>],
    request: &PackageRequest,
) -> Result<&'static str, ProvisionError> {
    let mut attempts = Vec::new();

    for strategy in strategies {
        match try_strategy(runner, strategy.as_ref(), request).await {
            Ok(()) => {
                info!("Installed packages using {}", strategy.name());
                return Ok(strategy.name());
            }
            Err(e) => {
                warn!("{} unavailable or failed: {}", strategy.name(), e);
                attempts.push(format!("{}: {}", strategy.name(), e));
            }
        }
    }

    Err(ProvisionError::NoPackageManager { attempts })
}

async fn try_strategy(
    runner: &dyn CommandRunner,
    strategy: &dyn PackageStrategy,
    request: &PackageRequest,
) -> Result<(), ProvisionError> {
    debug!("Updating package index using {}", strategy.name());
    runner
        .run_checked(&request.prepare(strategy.update_command()))
        .await?;

    let packages = request.packages_for(strategy);
    if packages.is_empty() {
        return Ok(());
    }

    debug!("Packages: {:?}", packages);
    runner
        .run_checked(&request.prepare(strategy.install_command(&packages)))
        .await?;
    Ok(())
}
