//! Template context building
//!
//! Builds the rendering context from the resolved configuration and the
//! guest layout.

use crate::config::BootstrapConfig;
use crate::layout::{CONFIG_SAMPLES, GuestPaths, SIBLING_EXCLUDES, SYNC_EXCLUDES, alias_lines};
use crate::packages::{PackageManager, PackageStrategy};
use minijinja::value::Value;
use std::collections::HashMap;

/// Build the template context for a configuration
pub fn build_context(config: &BootstrapConfig) -> HashMap<String, Value> {
    let mut ctx = HashMap::new();

    // VM options, as the orchestrator sees them
    ctx.insert("vm".to_string(), Value::from_serialize(config));

    ctx.insert("guest".to_string(), build_guest_context(config));

    ctx.insert("packages".to_string(), build_packages_context(config));

    let sudo = if config.guest.sudo { "sudo -E " } else { "" };
    ctx.insert("sudo".to_string(), Value::from(sudo));

    ctx
}

fn build_guest_context(config: &BootstrapConfig) -> Value {
    let paths = GuestPaths::from_config(config);
    let mut guest = HashMap::new();

    let path_str = |p: std::path::PathBuf| Value::from(p.to_string_lossy().into_owned());

    guest.insert("user".to_string(), Value::from(config.guest.user.clone()));
    guest.insert("home".to_string(), path_str(paths.home.clone()));
    guest.insert("stack_dir".to_string(), path_str(paths.stack_dir.clone()));
    guest.insert("project".to_string(), Value::from(config.guest.project.clone()));
    guest.insert(
        "siblings".to_string(),
        Value::from_serialize(&config.guest.siblings),
    );
    guest.insert(
        "devstack_repo".to_string(),
        Value::from(config.guest.devstack_repo.clone()),
    );
    guest.insert(
        "rally_repo".to_string(),
        Value::from(config.guest.rally_repo.clone()),
    );
    guest.insert(
        "gitconfig".to_string(),
        Value::from_serialize(&config.guest.gitconfig),
    );
    guest.insert("devstack_dir".to_string(), path_str(paths.devstack_dir()));
    guest.insert("rally_dir".to_string(), path_str(paths.rally_dir()));
    guest.insert("bin_dir".to_string(), path_str(paths.bin_dir()));
    guest.insert("refresh_script".to_string(), path_str(paths.refresh_script()));
    guest.insert("bash_aliases".to_string(), path_str(paths.bash_aliases()));
    guest.insert("gitconfig_path".to_string(), path_str(paths.gitconfig()));
    guest.insert("stack_plugin_dir".to_string(), path_str(paths.stack_plugin_dir()));
    guest.insert(
        "excludes".to_string(),
        Value::from_serialize(SYNC_EXCLUDES),
    );
    guest.insert(
        "sibling_excludes".to_string(),
        Value::from_serialize(SIBLING_EXCLUDES),
    );
    guest.insert(
        "config_samples".to_string(),
        Value::from_serialize(CONFIG_SAMPLES),
    );
    guest.insert(
        "aliases".to_string(),
        Value::from_serialize(alias_lines(&paths)),
    );

    Value::from_serialize(&guest)
}

/// Package lists per package manager, keyed by manager name
fn build_packages_context(config: &BootstrapConfig) -> Value {
    let mut lists = HashMap::new();

    for manager in [PackageManager::Apt, PackageManager::Yum] {
        let mut packages = vec!["git"];
        packages.extend(config.extra_packages());
        if config.install_build_deps {
            packages.extend(manager.build_deps());
        }
        let key = match manager {
            PackageManager::Apt => "apt",
            PackageManager::Yum => "yum",
        };
        lists.insert(key, packages);
    }

    Value::from_serialize(&lists)
}
