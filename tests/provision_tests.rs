//! End-to-end provisioning tests against a temporary guest layout

use devstack_bootstrap::runner::mock::RecordingRunner;
use devstack_bootstrap::state::{RunState, StatusFile};
use devstack_bootstrap::{BootstrapConfig, ProvisionError, Provisioner};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Guest with a cue checkout in the home directory
struct Guest {
    temp: TempDir,
    config: BootstrapConfig,
}

impl Guest {
    fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let home = temp.path().join("home");
        let stack = temp.path().join("stack");

        let cue = home.join("cue");
        fs::create_dir_all(cue.join("devstack/lib")).unwrap();
        fs::create_dir_all(cue.join(".tox/py27")).unwrap();
        fs::create_dir_all(&stack).unwrap();
        fs::write(cue.join("setup.py"), "setup()").unwrap();
        fs::write(cue.join("devstack/local.conf"), "[[local|localrc]]\n").unwrap();
        fs::write(cue.join("devstack/local.sh"), "#!/bin/bash\n").unwrap();
        fs::write(cue.join("devstack/lib/cue"), "# cue plugin\n").unwrap();
        fs::write(cue.join(".tox/py27/junk"), "junk").unwrap();

        let mut config = BootstrapConfig::default();
        config.guest.home = Some(home.to_string_lossy().into_owned());
        config.guest.stack_dir = stack.to_string_lossy().into_owned();
        config.guest.sudo = false;

        Self { temp, config }
    }

    fn home(&self) -> std::path::PathBuf {
        self.temp.path().join("home")
    }

    fn stack(&self) -> std::path::PathBuf {
        self.temp.path().join("stack")
    }

    fn provisioner<'a>(&'a self, runner: &'a RecordingRunner) -> Provisioner<'a> {
        Provisioner::new(&self.config, runner)
            .with_launcher("/usr/local/bin/devstack-bootstrap", "/etc/devstack-bootstrap")
    }
}

fn git_commands(runner: &RecordingRunner) -> Vec<String> {
    runner
        .command_lines()
        .into_iter()
        .filter(|c| c.starts_with("git "))
        .collect()
}

fn is_executable(path: &Path) -> bool {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path).unwrap().permissions().mode() & 0o111 != 0
    }
    #[cfg(not(unix))]
    {
        path.exists()
    }
}

#[tokio::test]
async fn test_fresh_provision() {
    let guest = Guest::new();
    let runner = RecordingRunner::new().with_simulated_clones();

    let report = guest.provisioner(&runner).provision().await.unwrap();

    assert_eq!(report.package_manager, Some("apt-get"));
    let lines = runner.command_lines();
    assert_eq!(lines[0], "apt-get -qqy update");
    assert!(lines[1].starts_with("apt-get install -qqy git build-essential"));

    // devstack and rally are cloned
    assert_eq!(git_commands(&runner).len(), 2);
    assert_eq!(report.cloned.len(), 2);
    assert!(guest.home().join("devstack").is_dir());

    // refresh launcher
    let launcher = guest.home().join("bin/refresh_devstack.sh");
    assert!(is_executable(&launcher));
    assert!(fs::read_to_string(&launcher).unwrap().contains("refresh --config-dir /etc/devstack-bootstrap"));

    // aliases
    let aliases = fs::read_to_string(guest.home().join(".bash_aliases")).unwrap();
    assert!(aliases.contains(&format!("alias refresh_devstack=\"{}\"", launcher.display())));
    assert!(aliases.contains("alias delete_clusters="));

    // sources synced without work directories
    assert!(guest.stack().join("cue/setup.py").exists());
    assert!(!guest.stack().join("cue/.tox").exists());

    // samples and plugin links
    assert_eq!(report.samples_installed, 2);
    assert!(guest.home().join("devstack/local.conf").exists());
    assert!(guest.home().join("devstack/local.sh").exists());
    assert_eq!(report.links_created, 1);

    #[cfg(unix)]
    assert_eq!(
        fs::read_link(guest.home().join("devstack/lib/cue")).unwrap(),
        guest.stack().join("cue/devstack/lib/cue")
    );

    let status = StatusFile::new(guest.home().join(".devstack-bootstrap/status.json"))
        .read()
        .await
        .unwrap();
    assert_eq!(status.status, RunState::Done);
    assert_eq!(status.completed_steps.len(), 9);
}

#[tokio::test]
async fn test_provision_twice_is_idempotent() {
    let guest = Guest::new();
    let runner = RecordingRunner::new().with_simulated_clones();

    guest.provisioner(&runner).provision().await.unwrap();

    let local_conf = guest.home().join("devstack/local.conf");
    fs::write(&local_conf, "edited by operator").unwrap();
    let aliases_before = fs::read_to_string(guest.home().join(".bash_aliases")).unwrap();

    let report = guest.provisioner(&runner).provision().await.unwrap();

    assert!(report.cloned.is_empty());
    assert_eq!(git_commands(&runner).len(), 2);
    assert_eq!(report.samples_installed, 0);
    assert_eq!(report.links_created, 0);
    assert_eq!(report.aliases_added, 0);
    assert_eq!(fs::read_to_string(&local_conf).unwrap(), "edited by operator");
    assert_eq!(
        fs::read_to_string(guest.home().join(".bash_aliases")).unwrap(),
        aliases_before
    );
    assert!(!report.resumed_interrupted);
}

#[tokio::test]
async fn test_falls_back_to_yum() {
    let guest = Guest::new();
    let runner = RecordingRunner::new()
        .with_missing("apt-get")
        .with_simulated_clones();

    let report = guest.provisioner(&runner).provision().await.unwrap();

    assert_eq!(report.package_manager, Some("yum"));
    assert!(runner.command_lines().iter().any(|c| c.starts_with("yum install -q -y git gcc")));
}

#[tokio::test]
async fn test_no_package_manager_aborts() {
    let guest = Guest::new();
    let runner = RecordingRunner::new()
        .with_missing("apt-get")
        .with_missing("yum");

    let err = guest.provisioner(&runner).provision().await.unwrap_err();
    assert!(matches!(err, ProvisionError::NoPackageManager { .. }));

    // nothing after the package step ran
    assert!(git_commands(&runner).is_empty());
    assert!(!guest.home().join("bin").exists());

    let status = StatusFile::new(guest.home().join(".devstack-bootstrap/status.json"))
        .read()
        .await
        .unwrap();
    assert_eq!(status.status, RunState::Failed);
    assert!(status.completed_steps.is_empty());
}

#[tokio::test]
async fn test_refresh_keeps_existing_plugin_file() {
    let guest = Guest::new();
    let lib = guest.home().join("devstack/lib");
    fs::create_dir_all(&lib).unwrap();
    fs::write(lib.join("cue"), "local override").unwrap();

    let runner = RecordingRunner::new();
    let report = guest.provisioner(&runner).refresh().await.unwrap();

    assert_eq!(report.links_created, 0);
    assert_eq!(fs::read_to_string(lib.join("cue")).unwrap(), "local override");
    // refresh never launches commands
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn test_refresh_syncs_present_siblings_only() {
    let guest = Guest::new();
    let client = guest.home().join("python-cueclient");
    fs::create_dir_all(client.join("contrib/vagrant")).unwrap();
    fs::write(client.join("contrib/vagrant/Vagrantfile"), "vm").unwrap();
    fs::write(client.join("contrib/README"), "docs").unwrap();
    fs::write(client.join("setup.py"), "setup()").unwrap();

    let runner = RecordingRunner::new();
    let report = guest.provisioner(&runner).refresh().await.unwrap();

    let names: Vec<&str> = report.synced.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["cue", "python-cueclient"]);

    let synced = guest.stack().join("python-cueclient");
    assert!(synced.join("setup.py").exists());
    assert!(synced.join("contrib/README").exists());
    assert!(!synced.join("contrib/vagrant").exists());
    assert!(!guest.stack().join("cue-dashboard").exists());
}

#[tokio::test]
async fn test_refresh_without_project_fails() {
    let guest = Guest::new();
    fs::remove_dir_all(guest.home().join("cue")).unwrap();

    let runner = RecordingRunner::new();
    let err = guest.provisioner(&runner).refresh().await.unwrap_err();
    assert!(matches!(err, ProvisionError::Step { .. }));
}

#[tokio::test]
async fn test_install_devstack_runs_stack_sh() {
    let mut guest = Guest::new();
    guest.config.install_devstack = true;
    guest.config.install_rally = false;

    let devstack = guest.home().join("devstack");
    fs::create_dir_all(&devstack).unwrap();
    fs::write(devstack.join("stack.sh"), "#!/bin/bash\n").unwrap();

    let runner = RecordingRunner::new();
    guest.provisioner(&runner).provision().await.unwrap();

    let commands = runner.commands();
    let last = commands.last().unwrap();
    assert_eq!(last.program, "./stack.sh");
    assert_eq!(last.cwd.as_deref(), Some(devstack.as_path()));
    assert!(git_commands(&runner).is_empty());
}

#[tokio::test]
async fn test_gitconfig_written() {
    let mut guest = Guest::new();
    guest.config.guest.gitconfig = Some("[user]\n\tname = Dev\n".to_string());

    let runner = RecordingRunner::new().with_simulated_clones();
    guest.provisioner(&runner).provision().await.unwrap();

    assert_eq!(
        fs::read_to_string(guest.home().join(".gitconfig")).unwrap(),
        "[user]\n\tname = Dev\n"
    );
}

#[tokio::test]
async fn test_refresh_recovers_from_truncated_status() {
    let guest = Guest::new();
    let runner = RecordingRunner::new();
    let provisioner = guest.provisioner(&runner);

    // a run killed while writing its status record
    let status_path = provisioner.paths().status_file();
    fs::create_dir_all(status_path.parent().unwrap()).unwrap();
    fs::write(&status_path, "{\n  \"status\": \"runn").unwrap();

    let report = provisioner.refresh().await.unwrap();
    assert!(report.resumed_interrupted);

    let status = StatusFile::new(&status_path).read().await.unwrap();
    assert_eq!(status.status, RunState::Done);
    assert!(!status_path.with_file_name(".status.json.tmp").exists());
}

#[tokio::test]
async fn test_launcher_uses_absolute_config_dir() {
    let guest = Guest::new();
    let runner = RecordingRunner::new().with_simulated_clones();

    Provisioner::new(&guest.config, &runner)
        .with_launcher("/usr/local/bin/devstack-bootstrap", "conf")
        .provision()
        .await
        .unwrap();

    let expected = std::env::current_dir().unwrap().join("conf");
    let launcher = fs::read_to_string(guest.home().join("bin/refresh_devstack.sh")).unwrap();
    assert!(launcher.contains(&expected.display().to_string()));
    assert!(!launcher.contains("--config-dir conf"));
}
