// tests/integration_test.rs

//! Integration tests for VulPKG
//!
//! These tests drive whole install/remove transactions against isolated
//! temporary roots.

use std::cell::RefCell;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::rc::Rc;
use vulpkg::command::{CommandOutput, CommandRunner, SystemCommandRunner};
use vulpkg::db::LedgerStore;
use vulpkg::{Config, Error, PackageManager, TransactionState};

/// Pretends every command succeeds and remembers what it was asked to run
#[derive(Clone, Default)]
struct FakeRunner {
    calls: Rc<RefCell<Vec<String>>>,
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &str, _elevate: bool) -> CommandOutput {
        self.calls.borrow_mut().push(command.to_string());
        CommandOutput::ok("")
    }

    fn is_privileged(&self) -> bool {
        true
    }
}

fn fake_manager(root: &Path, answer: bool) -> (PackageManager, FakeRunner) {
    let runner = FakeRunner::default();
    let manager = PackageManager::new(
        Config::with_root(root),
        Box::new(runner.clone()),
        Box::new(move |_: &str| answer),
    )
    .unwrap();
    (manager, runner)
}

fn write_descriptor(dir: &Path, file: &str, json: &str) -> String {
    let path = dir.join(file);
    fs::write(&path, json).unwrap();
    path.to_str().unwrap().to_string()
}

#[test]
fn test_install_script_file_from_descriptor() {
    let root = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    let target = target_dir.path().join("x.sh");
    let (mut manager, runner) = fake_manager(root.path(), true);

    let mut files = serde_json::Map::new();
    files.insert(target.to_str().unwrap().to_string(), "echo hi".into());
    let json = serde_json::json!({
        "name": "foo",
        "version": "1.0",
        "files": files
    });
    let descriptor = write_descriptor(root.path(), "foo.vulpkg", &json.to_string());

    let (name, entry) = manager.install_from(&descriptor).unwrap();
    assert_eq!(name, "foo");
    assert_eq!(entry.version, "1.0");

    assert_eq!(fs::read_to_string(&target).unwrap(), "echo hi");
    let mode = fs::metadata(&target).unwrap().permissions().mode();
    assert_ne!(mode & 0o111, 0, "script target should be executable");

    assert_eq!(manager.info("foo").unwrap().version, "1.0");
    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn test_missing_version_changes_nothing() {
    let root = tempfile::tempdir().unwrap();
    let (mut manager, runner) = fake_manager(root.path(), true);

    let descriptor = write_descriptor(
        root.path(),
        "foo.vulpkg",
        r#"{"name": "foo", "alpine_packages": ["curl"], "install_script": "true"}"#,
    );

    let result = manager.install_from(&descriptor);
    assert!(matches!(result, Err(Error::Validation(_))));

    assert!(manager.ledger().is_empty());
    assert!(!manager.config().ledger_path.exists());
    assert_eq!(fs::read_dir(&manager.config().install_root).unwrap().count(), 0);
    assert!(runner.calls.borrow().is_empty());
}

#[test]
fn test_malformed_descriptor_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let (mut manager, _runner) = fake_manager(root.path(), true);

    let descriptor = write_descriptor(root.path(), "bad.vulpkg", "{\"name\": \"bad\",");
    assert!(matches!(
        manager.install_from(&descriptor),
        Err(Error::Parse { .. })
    ));
    assert!(manager.ledger().is_empty());
}

#[test]
fn test_install_then_remove_restores_ledger() {
    let root = tempfile::tempdir().unwrap();
    let (mut manager, _runner) = fake_manager(root.path(), true);

    let descriptor = write_descriptor(
        root.path(),
        "tool.vulpkg",
        r#"{"name": "tool", "version": "0.3", "files": {"bin/tool.sh": "echo tool"}}"#,
    );
    let (_, entry) = manager.install_from(&descriptor).unwrap();
    assert!(entry.install_dir.join("bin/tool.sh").exists());

    manager.remove("tool").unwrap();

    assert!(!manager.ledger().is_installed("tool"));
    assert!(!entry.install_dir.exists());
    assert!(LedgerStore::new(&manager.config().ledger_path).load().is_empty());
}

#[test]
fn test_reinstall_yes_leaves_single_new_entry() {
    let root = tempfile::tempdir().unwrap();
    let (mut manager, _runner) = fake_manager(root.path(), true);

    let v1 = write_descriptor(root.path(), "v1.vulpkg", r#"{"name": "foo", "version": "1.0"}"#);
    let v2 = write_descriptor(
        root.path(),
        "v2.vulpkg",
        r#"{"name": "foo", "version": "2.0", "description": "second"}"#,
    );

    manager.install_from(&v1).unwrap();
    manager.install_from(&v2).unwrap();

    let ledger = LedgerStore::new(&manager.config().ledger_path).load();
    assert_eq!(ledger.len(), 1);
    let entry = ledger.get("foo").unwrap();
    assert_eq!(entry.version, "2.0");
    assert_eq!(entry.description, "second");
}

#[test]
fn test_remove_absent_package_leaves_ledger_untouched() {
    let root = tempfile::tempdir().unwrap();
    let (mut manager, _runner) = fake_manager(root.path(), true);

    let descriptor = write_descriptor(root.path(), "a.vulpkg", r#"{"name": "a", "version": "1"}"#);
    manager.install_from(&descriptor).unwrap();
    let on_disk = fs::read_to_string(&manager.config().ledger_path).unwrap();

    assert!(matches!(manager.remove("never"), Err(Error::NotInstalled(_))));
    assert_eq!(fs::read_to_string(&manager.config().ledger_path).unwrap(), on_disk);
}

#[test]
fn test_ledger_survives_new_manager() {
    let root = tempfile::tempdir().unwrap();
    {
        let (mut manager, _runner) = fake_manager(root.path(), true);
        let descriptor =
            write_descriptor(root.path(), "a.vulpkg", r#"{"name": "a", "version": "1"}"#);
        manager.install_from(&descriptor).unwrap();
    }

    let (manager, _runner) = fake_manager(root.path(), true);
    assert_eq!(manager.info("a").unwrap().version, "1");
}

#[test]
fn test_corrupt_ledger_starts_empty() {
    let root = tempfile::tempdir().unwrap();
    let config = Config::with_root(root.path());
    config.init().unwrap();
    fs::write(&config.ledger_path, "not json at all").unwrap();

    let (manager, _runner) = fake_manager(root.path(), true);
    assert!(manager.ledger().is_empty());
}

#[test]
fn test_install_by_repository_name() {
    let root = tempfile::tempdir().unwrap();
    let (mut manager, runner) = fake_manager(root.path(), true);

    fs::write(
        manager.config().repo_descriptor("nmap"),
        r#"{
            "name": "nmap",
            "version": "7.94",
            "requires_sudo": true,
            "alpine_packages": ["nmap", "edge:nmap-scripts"]
        }"#,
    )
    .unwrap();

    let (name, entry) = manager.install_from("nmap").unwrap();
    assert_eq!(name, "nmap");
    assert!(entry.requires_sudo);

    let calls = runner.calls.borrow();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0], "apk add nmap");
    assert!(calls[1].ends_with("nmap-scripts"));
}

#[test]
fn test_real_script_runs_in_package_directory() {
    let root = tempfile::tempdir().unwrap();
    let mut manager = PackageManager::new(
        Config::with_root(root.path()),
        Box::new(SystemCommandRunner::new()),
        Box::new(|_: &str| false),
    )
    .unwrap();

    let descriptor = write_descriptor(
        root.path(),
        "builder.vulpkg",
        r#"{"name": "builder", "version": "1", "install_script": "echo built > artifact.txt"}"#,
    );
    let (_, entry) = manager.install_from(&descriptor).unwrap();

    let artifact = fs::read_to_string(entry.install_dir.join("artifact.txt")).unwrap();
    assert_eq!(artifact.trim(), "built");

    // Only the artifact remains; the generated script is gone
    let names: Vec<_> = fs::read_dir(&entry.install_dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["artifact.txt"]);
}

#[test]
fn test_real_script_failure_names_step() {
    let root = tempfile::tempdir().unwrap();
    let mut manager = PackageManager::new(
        Config::with_root(root.path()),
        Box::new(SystemCommandRunner::new()),
        Box::new(|_: &str| false),
    )
    .unwrap();

    let descriptor = write_descriptor(
        root.path(),
        "broken.vulpkg",
        r#"{"name": "broken", "version": "1", "install_script": "echo 'no compiler' >&2; exit 2"}"#,
    );

    let err = manager.install_from(&descriptor).unwrap_err();
    match &err {
        Error::TransactionFailed { package, step, .. } => {
            assert_eq!(package, "broken");
            assert_eq!(*step, TransactionState::RunningScript);
        }
        other => panic!("expected transaction failure, got {:?}", other),
    }
    assert!(err.to_string().contains("no compiler"));
    assert!(!manager.ledger().is_installed("broken"));
    assert!(!manager.config().package_dir("broken").exists());
}
