//! Integration tests for the regen binary

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use regen::snapshots::FsSnapshotRepository;
use regen::versions::VERSIONS_INDEX;

use crate::helpers::text_snapshot;

/// Archive on disk with a config file pointing at it.
fn archive() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    fs::create_dir_all(root.join("declarations")).unwrap();
    fs::write(
        root.join("declarations/svc.json"),
        r#"{
  "name": "Service",
  "documents": {
    "tos": { "fetch": "https://example.com/tos", "select": "main" }
  }
}"#,
    )
    .unwrap();

    let mut snapshots = FsSnapshotRepository::open(root.join("snapshots")).unwrap();
    snapshots
        .add(&text_snapshot("a1", "svc", "tos", 1, "Hello world"))
        .unwrap();
    snapshots
        .add(&text_snapshot("a2", "svc", "tos", 2, "Hello world"))
        .unwrap();
    snapshots
        .add(&text_snapshot("a3", "svc", "tos", 3, "Hello world v2"))
        .unwrap();

    fs::write(
        root.join("config.toml"),
        format!(
            "[paths]\ndeclarations = {:?}\nsnapshots = {:?}\nversions = {:?}\noutput = {:?}\n",
            root.join("declarations"),
            root.join("snapshots"),
            root.join("versions"),
            root.join("output"),
        ),
    )
    .unwrap();

    dir
}

fn regen(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("regen").unwrap();
    cmd.env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(root.join("config.toml"));
    cmd
}

// ============================================================================
// Help Output Tests
// ============================================================================

#[test]
fn help_lists_subcommands() {
    Command::cargo_bin("regen")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("progress"))
        .stdout(predicate::str::contains("rules"));
}

#[test]
fn run_help_documents_filters() {
    Command::cargo_bin("regen")
        .unwrap()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--document-type"))
        .stdout(predicate::str::contains("--restart"));
}

#[test]
fn long_version_shows_repository() {
    Command::cargo_bin("regen")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("repository: "));
}

#[test]
fn unknown_subcommand_fails() {
    Command::cargo_bin("regen")
        .unwrap()
        .arg("regenerate-everything")
        .assert()
        .code(2);
}

// ============================================================================
// Run
// ============================================================================

#[test]
fn run_records_versions_and_checkpoint() {
    let dir = archive();
    let root = dir.path();

    regen(root)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Hello world"))
        .stderr(predicate::str::contains("3 snapshots processed: 2 versions generated, 1 identical versions"));

    let latest = fs::read_to_string(root.join("versions/svc/tos.md")).unwrap();
    assert_eq!(latest, "Hello world v2");
    let index = fs::read_to_string(root.join("versions").join(VERSIONS_INDEX)).unwrap();
    assert_eq!(index.lines().count(), 2);

    regen(root)
        .args(["progress", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Last snapshot: a3"))
        .stdout(predicate::str::contains("Next index:    4"));
}

#[test]
fn second_run_resumes_with_nothing_left() {
    let dir = archive();
    let root = dir.path();

    regen(root).arg("run").assert().success();
    regen(root)
        .arg("run")
        .assert()
        .success()
        .stderr(predicate::str::contains("Resuming from snapshot a3"))
        .stderr(predicate::str::contains("0 snapshots processed"));

    regen(root).args(["progress", "reset"]).assert().success();
    regen(root)
        .args(["progress", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No run in progress"));
}

// ============================================================================
// Rules and listing
// ============================================================================

#[test]
fn rules_edits_are_visible_in_listing_and_show() {
    let dir = archive();
    let root = dir.path();

    regen(root)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("❌ svc tos"));

    regen(root)
        .args(["rules", "skip-selector", "svc", "tos", ".captcha"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added skipSelector rule to svc - tos"));
    regen(root)
        .args(["rules", "done", "svc", "tos"])
        .assert()
        .success();

    regen(root)
        .args(["rules", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"skipSelector\""))
        .stdout(predicate::str::contains(".captcha"));
    regen(root)
        .args(["list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("✅ svc tos"));

    assert!(root.join("cleaning/index.json").exists());
}

#[test]
fn skip_commit_rule_skips_snapshot() {
    let dir = archive();
    let root = dir.path();

    regen(root)
        .args(["rules", "skip-commit", "*", "tos", "a3"])
        .assert()
        .success();
    regen(root)
        .arg("run")
        .assert()
        .success()
        .stderr(predicate::str::contains("1 versions generated"));

    let latest = fs::read_to_string(root.join("versions/svc/tos.md")).unwrap();
    assert_eq!(latest, "Hello world");
}

// ============================================================================
// Config
// ============================================================================

#[test]
fn config_init_and_show() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("nested/config.toml");

    Command::cargo_bin("regen")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config)
        .args(["config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    Command::cargo_bin("regen")
        .unwrap()
        .env("NO_COLOR", "1")
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[paths]"))
        .stdout(predicate::str::contains("progress_log_interval = 10"))
        .stdout(predicate::str::contains("cleaning/index.json"));
}

#[test]
fn completions_are_generated() {
    Command::cargo_bin("regen")
        .unwrap()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("regen"));
}
