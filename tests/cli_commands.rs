use assert_cmd::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

/// Runs the binary from an empty directory so no local config or env overrides leak in.
fn sweeper(workdir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("sweeper").expect("sweeper binary");
    cmd.current_dir(workdir)
        .env("XDG_CONFIG_HOME", workdir)
        .env("HOME", workdir)
        .env_remove("RUST_LOG")
        .env_remove("SWEEPER_LOG_JSON");
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let assert = cmd.assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 output")
}

#[test]
fn owner_is_read_from_timeline_url() {
    let dir = TempDir::new().unwrap();
    let stdout = stdout_of(sweeper(dir.path()).args(["owner", "https://x.com/@Alice/with_replies"]));
    assert_eq!(stdout.trim(), "alice");
}

#[test]
fn owner_rejects_site_routes() {
    let dir = TempDir::new().unwrap();
    let assert = sweeper(dir.path())
        .args(["owner", "https://x.com/home"])
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("no timeline owner"), "stderr: {stderr}");
}

#[test]
fn owner_report_as_json() {
    let dir = TempDir::new().unwrap();
    let stdout = stdout_of(sweeper(dir.path()).args([
        "--output",
        "json",
        "owner",
        "https://twitter.com/Bob",
    ]));
    let value: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(value["owner"].as_str(), Some("bob"));
    assert_eq!(value["url"].as_str(), Some("https://twitter.com/Bob"));
}

#[test]
fn config_get_reads_explicit_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sweeper.yaml");
    fs::write(&path, "sweep:\n  attempt_budget: 42\n").unwrap();

    let stdout = stdout_of(sweeper(dir.path()).args([
        "--config",
        path.to_str().unwrap(),
        "config",
        "get",
        "sweep.attempt_budget",
    ]));
    assert_eq!(stdout.trim(), "42");

    let stdout = stdout_of(sweeper(dir.path()).args([
        "--config",
        path.to_str().unwrap(),
        "config",
        "get",
        "site.container_marker",
    ]));
    assert_eq!(stdout.trim(), "cellInnerDiv");
}

#[test]
fn config_get_unknown_key_fails() {
    let dir = TempDir::new().unwrap();
    sweeper(dir.path())
        .args(["config", "get", "sweep.nope"])
        .assert()
        .failure();
}

#[test]
fn config_show_as_json_includes_every_section() {
    let dir = TempDir::new().unwrap();
    let stdout = stdout_of(sweeper(dir.path()).args(["-o", "json", "config", "show"]));
    let value: Value = serde_json::from_str(&stdout).expect("valid json");
    for section in ["browser", "sweep", "tempo", "site"] {
        assert!(value.get(section).is_some(), "missing {section}");
    }
    assert_eq!(value["sweep"]["no_progress_budget"].as_u64(), Some(20));
}

#[test]
fn invalid_config_is_rejected_before_any_command() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("sweeper.yaml");
    fs::write(&path, "site:\n  delete_labels: []\n").unwrap();

    let assert = sweeper(dir.path())
        .args(["--config", path.to_str().unwrap(), "config", "validate"])
        .assert()
        .failure();
    let stderr = String::from_utf8(assert.get_output().stderr.clone()).unwrap();
    assert!(stderr.contains("delete_labels"), "stderr: {stderr}");
}

#[test]
fn missing_explicit_config_fails() {
    let dir = TempDir::new().unwrap();
    sweeper(dir.path())
        .args(["--config", "absent.yaml", "config", "show"])
        .assert()
        .failure();
}

#[test]
fn sweep_requires_a_url() {
    let dir = TempDir::new().unwrap();
    sweeper(dir.path()).arg("sweep").assert().failure();
}
