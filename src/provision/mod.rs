//! Provisioning and refresh
//!
//! Steps run strictly in order and stop at the first failure. Each step
//! checks existing state before acting, so the whole procedure can be run
//! any number of times:
//! 1. Packages - update the index and install git (apt, falling back to yum)
//! 2. Git config - write ~/.gitconfig when one is configured
//! 3. Clone - devstack (and rally) unless already checked out
//! 4. Launcher - ~/bin/refresh_devstack.sh
//! 5. Aliases - refresh_devstack and cluster helpers in ~/.bash_aliases
//! 6. Refresh - sync sources, install config samples, link plugins
//! 7. Stack - run stack.sh when requested

pub mod files;
pub mod repos;
pub mod sync;

pub use sync::SyncStats;

use crate::config::BootstrapConfig;
use crate::layout::{self, CONFIG_SAMPLES, GuestPaths, SIBLING_EXCLUDES, SYNC_EXCLUDES};
use crate::packages::{self, PackageRequest, PackageStrategy};
use crate::render;
use crate::runner::CommandRunner;
use crate::state::StatusFile;
use crate::ProvisionError;
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, warn};

/// Provisioning steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Packages,
    GitConfig,
    Clone,
    Launcher,
    Aliases,
    SyncSources,
    ConfigSamples,
    LinkPlugins,
    Stack,
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Step::Packages => write!(f, "packages"),
            Step::GitConfig => write!(f, "gitconfig"),
            Step::Clone => write!(f, "clone"),
            Step::Launcher => write!(f, "launcher"),
            Step::Aliases => write!(f, "aliases"),
            Step::SyncSources => write!(f, "sync"),
            Step::ConfigSamples => write!(f, "config-samples"),
            Step::LinkPlugins => write!(f, "link-plugins"),
            Step::Stack => write!(f, "stack"),
        }
    }
}

/// Steps of a refresh
pub const REFRESH_STEPS: &[Step] = &[Step::SyncSources, Step::ConfigSamples, Step::LinkPlugins];

/// Steps of a full provision, in order
pub const PROVISION_STEPS: &[Step] = &[
    Step::Packages,
    Step::GitConfig,
    Step::Clone,
    Step::Launcher,
    Step::Aliases,
    Step::SyncSources,
    Step::ConfigSamples,
    Step::LinkPlugins,
    Step::Stack,
];

/// What a run did
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Package manager that installed packages
    pub package_manager: Option<&'static str>,
    /// Checkouts cloned during this run
    pub cloned: Vec<PathBuf>,
    /// Trees synchronized, with their stats
    pub synced: Vec<(String, SyncStats)>,
    /// Config samples copied into devstack
    pub samples_installed: usize,
    /// Plugin links created
    pub links_created: usize,
    /// Alias lines appended
    pub aliases_added: usize,
    /// The previous run had been interrupted
    pub resumed_interrupted: bool,
}

/// Runs the provisioning procedure against one guest layout
pub struct Provisioner<'a> {
    config: &'a BootstrapConfig,
    runner: &'a dyn CommandRunner,
    paths: GuestPaths,
    strategies: Vec<Box<dyn PackageStrategy>>,
    binary: PathBuf,
    config_dir: PathBuf,
}

impl<'a> Provisioner<'a> {
    /// Create a provisioner for `config`, launching commands through `runner`
    pub fn new(config: &'a BootstrapConfig, runner: &'a dyn CommandRunner) -> Self {
        Self {
            config,
            runner,
            paths: GuestPaths::from_config(config),
            strategies: packages::default_strategies(),
            binary: std::env::current_exe().unwrap_or_else(|_| PathBuf::from("devstack-bootstrap")),
            config_dir: PathBuf::from(crate::config::loader::CONFIG_DIR),
        }
    }

    /// Override the package strategies
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn PackageStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Set the binary and config directory the refresh launcher invokes
    ///
    /// Relative paths are resolved against the current directory, since the
    /// launcher runs from wherever the operator happens to be.
    pub fn with_launcher(mut self, binary: impl Into<PathBuf>, config_dir: impl Into<PathBuf>) -> Self {
        self.binary = absolute_or_given(binary.into());
        self.config_dir = absolute_or_given(config_dir.into());
        self
    }

    pub fn paths(&self) -> &GuestPaths {
        &self.paths
    }

    /// Run the full provisioning procedure
    pub async fn provision(&self) -> Result<RunReport, ProvisionError> {
        self.run_tracked("provision", PROVISION_STEPS).await
    }

    /// Re-sync sources and re-link plugins
    pub async fn refresh(&self) -> Result<RunReport, ProvisionError> {
        self.run_tracked("refresh", REFRESH_STEPS).await
    }

    async fn run_tracked(&self, command: &str, steps: &[Step]) -> Result<RunReport, ProvisionError> {
        let status = StatusFile::new(self.paths.status_file());
        let mut report = RunReport {
            resumed_interrupted: status.begin(command).await?,
            ..Default::default()
        };

        let result = self.run_steps(steps, &status, &mut report).await;
        if let Err(e) = status.finish(result.as_ref().err()).await {
            warn!("Could not record the outcome in {}: {}", status.path().display(), e);
        }
        result.map(|_| report)
    }

    async fn run_steps(
        &self,
        steps: &[Step],
        status: &StatusFile,
        report: &mut RunReport,
    ) -> Result<(), ProvisionError> {
        for step in steps {
            info!("Starting step: {}", step);
            self.run_step(*step, report).await?;
            status.step_done(&step.to_string()).await?;
            info!("Completed step: {}", step);
        }
        Ok(())
    }

    async fn run_step(&self, step: Step, report: &mut RunReport) -> Result<(), ProvisionError> {
        match step {
            Step::Packages => {
                report.package_manager = Some(self.install_packages().await?);
            }
            Step::GitConfig => self.write_gitconfig().await?,
            Step::Clone => report.cloned = self.clone_repos().await?,
            Step::Launcher => self.install_launcher().await?,
            Step::Aliases => report.aliases_added = self.register_aliases().await?,
            Step::SyncSources => report.synced = self.sync_sources().await?,
            Step::ConfigSamples => report.samples_installed = self.install_samples().await?,
            Step::LinkPlugins => report.links_created = self.link_plugins().await?,
            Step::Stack => {
                if self.config.install_devstack {
                    repos::run_stack(self.runner, &self.paths.devstack_dir()).await?;
                } else {
                    debug!("install_devstack disabled, not running stack.sh");
                }
            }
        }
        Ok(())
    }

    async fn install_packages(&self) -> Result<&'static str, ProvisionError> {
        let mut wanted = vec!["git".to_string()];
        wanted.extend(self.config.extra_packages().into_iter().map(String::from));

        let request = PackageRequest {
            packages: wanted,
            build_deps: self.config.install_build_deps,
            proxy: self.config.package_proxy.clone(),
            sudo: self.config.guest.sudo,
        };
        packages::install_with_fallback(self.runner, &self.strategies, &request).await
    }

    async fn write_gitconfig(&self) -> Result<(), ProvisionError> {
        match &self.config.guest.gitconfig {
            Some(content) => files::write_file(&self.paths.gitconfig(), content).await,
            None => {
                debug!("No gitconfig configured");
                Ok(())
            }
        }
    }

    async fn clone_repos(&self) -> Result<Vec<PathBuf>, ProvisionError> {
        let mut checkouts = vec![(&self.config.guest.devstack_repo, self.paths.devstack_dir())];
        if self.config.install_rally {
            checkouts.push((&self.config.guest.rally_repo, self.paths.rally_dir()));
        }

        let mut cloned = Vec::new();
        for (url, dir) in checkouts {
            if repos::clone_if_absent(self.runner, url, &dir).await? {
                cloned.push(dir);
            }
        }
        Ok(cloned)
    }

    async fn install_launcher(&self) -> Result<(), ProvisionError> {
        let script = render::render_launcher(&self.binary, &self.config_dir)?;
        files::write_executable(&self.paths.refresh_script(), &script).await
    }

    async fn register_aliases(&self) -> Result<usize, ProvisionError> {
        let lines = layout::alias_lines(&self.paths);
        files::append_missing_lines(&self.paths.bash_aliases(), &lines).await
    }

    async fn sync_sources(&self) -> Result<Vec<(String, SyncStats)>, ProvisionError> {
        let project = &self.config.guest.project;
        let mut synced = Vec::new();

        let stats = sync::sync_tree(
            &self.paths.source_dir(project),
            &self.paths.stack_project(),
            SYNC_EXCLUDES,
        )
        .await?;
        synced.push((project.clone(), stats));

        let sibling_excludes: Vec<&str> = SYNC_EXCLUDES
            .iter()
            .chain(SIBLING_EXCLUDES)
            .copied()
            .collect();

        for sibling in &self.config.guest.siblings {
            let src = self.paths.source_dir(sibling);
            if !fs::try_exists(&src).await? {
                debug!("Sibling {} not checked out, skipping", sibling);
                continue;
            }
            let stats =
                sync::sync_tree(&src, &self.paths.stack_dir.join(sibling), &sibling_excludes).await?;
            synced.push((sibling.clone(), stats));
        }

        Ok(synced)
    }

    async fn install_samples(&self) -> Result<usize, ProvisionError> {
        let mut installed = 0;
        for sample in CONFIG_SAMPLES {
            let src = self.paths.stack_plugin_dir().join(sample);
            let dst = self.paths.devstack_dir().join(sample);
            if files::install_if_absent(&src, &dst).await? {
                installed += 1;
            }
        }
        Ok(installed)
    }

    async fn link_plugins(&self) -> Result<usize, ProvisionError> {
        files::link_missing(
            &self.paths.plugin_source_dir(),
            &self.paths.stack_plugin_dir().join("lib"),
            &self.paths.devstack_lib(),
        )
        .await
    }
}

fn absolute_or_given(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
