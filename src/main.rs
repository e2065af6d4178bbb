//! devstack-bootstrap - provision a devstack development VM
//!
//! Runs inside the guest (`provision`, `refresh`, `status`) and on the host
//! (`config export`, `script`) to hand options to the VM orchestrator.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

use devstack_bootstrap::config::{ConfigLoader, loader::CONFIG_DIR};
use devstack_bootstrap::layout::GuestPaths;
use devstack_bootstrap::runner::SystemRunner;
use devstack_bootstrap::state::StatusFile;
use devstack_bootstrap::{BootstrapConfig, Provisioner, RunReport, render};

#[derive(Parser)]
#[command(name = "devstack-bootstrap")]
#[command(author, version, about = "Provision a devstack development VM", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Directory holding devstack-bootstrap.yaml and devstack-bootstrap.d/
    #[arg(long, env = "DEVSTACK_BOOTSTRAP_CONFIG", default_value = CONFIG_DIR, global = true)]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full provisioning (packages, checkouts, launcher, refresh)
    Provision,
    /// Re-sync sources into the stack directory and re-link plugins
    Refresh,
    /// Show the status of the last run
    Status,
    /// Inspect or export the resolved options
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Print the equivalent shell provisioner
    Script {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the resolved options
    Show {
        /// Print JSON instead of YAML
        #[arg(long)]
        json: bool,
    },
    /// Render the Vagrant option file
    Export {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

async fn emit(content: &str, output: Option<&Path>) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
            info!("Wrote {}", path.display());
        }
        None => print!("{}", content),
    }
    Ok(())
}

fn log_report(report: &RunReport) {
    if report.resumed_interrupted {
        info!("Recovered from an interrupted run");
    }
    if let Some(pm) = report.package_manager {
        info!("Packages installed with {}", pm);
    }
    for dir in &report.cloned {
        info!("Cloned {}", dir.display());
    }
    for (name, stats) in &report.synced {
        info!("Synced {} ({} files copied)", name, stats.files_copied);
    }
    info!(
        "{} config samples installed, {} plugin links created, {} aliases added",
        report.samples_installed, report.links_created, report.aliases_added
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config: BootstrapConfig = ConfigLoader::new(&cli.config_dir)
        .load()
        .await
        .with_context(|| format!("loading options from {}", cli.config_dir.display()))?;

    let runner = SystemRunner;
    let provisioner = || {
        let binary = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("devstack-bootstrap"));
        Provisioner::new(&config, &runner).with_launcher(binary, &cli.config_dir)
    };

    match cli.command {
        Some(Commands::Provision) | None => {
            info!("Provisioning guest");
            let report = provisioner().provision().await.context("provisioning failed")?;
            log_report(&report);
        }
        Some(Commands::Refresh) => {
            info!("Refreshing stack sources");
            let report = provisioner().refresh().await.context("refresh failed")?;
            log_report(&report);
        }
        Some(Commands::Status) => {
            let paths = GuestPaths::from_config(&config);
            let file = StatusFile::new(paths.status_file());
            debug!("Reading {}", file.path().display());
            let status = file
                .read()
                .await
                .with_context(|| format!("cannot read {}", file.path().display()))?;
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Some(Commands::Config { action }) => match action {
            ConfigAction::Show { json } => {
                let rendered = if json {
                    serde_json::to_string_pretty(&config)? + "\n"
                } else {
                    serde_yaml::to_string(&config)?
                };
                print!("{}", rendered);
            }
            ConfigAction::Export { output } => {
                let rendered = render::render_vagrant_config(&config)?;
                emit(&rendered, output.as_deref()).await?;
            }
        },
        Some(Commands::Script { output }) => {
            let rendered = render::render_shell_provisioner(&config)?;
            emit(&rendered, output.as_deref()).await?;
        }
    }

    Ok(())
}
