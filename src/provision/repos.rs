//! Repository checkouts and devstack invocation

use crate::ProvisionError;
use crate::runner::{CommandRunner, CommandSpec};
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

/// Clone `url` into `dir` unless `dir` already exists; returns whether it cloned
pub async fn clone_if_absent(
    runner: &dyn CommandRunner,
    url: &str,
    dir: &Path,
) -> Result<bool, ProvisionError> {
    if fs::try_exists(dir).await? {
        debug!("{} already present, not cloning", dir.display());
        return Ok(false);
    }

    info!("Cloning {} into {}", url, dir.display());
    let cmd = CommandSpec::new("git")
        .arg("clone")
        .arg(url)
        .arg(dir.to_string_lossy());
    runner
        .run_checked(&cmd)
        .await
        .map_err(|e| ProvisionError::step("clone", e.to_string()))?;
    Ok(true)
}

/// Run devstack's stack.sh from its checkout
pub async fn run_stack(runner: &dyn CommandRunner, devstack_dir: &Path) -> Result<(), ProvisionError> {
    if !fs::try_exists(devstack_dir.join("stack.sh")).await? {
        return Err(ProvisionError::step(
            "stack",
            format!("no stack.sh in {}", devstack_dir.display()),
        ));
    }

    info!("Running stack.sh in {}", devstack_dir.display());
    let cmd = CommandSpec::new("./stack.sh").current_dir(devstack_dir);
    runner
        .run_checked(&cmd)
        .await
        .map_err(|e| ProvisionError::step("stack", e.to_string()))?;
    Ok(())
}
