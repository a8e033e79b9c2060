//! Binary-level checks with `assert_cmd`.
//!
//! No backend is running, so every case here must fail or finish before the
//! first network call.

mod common;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use common::temp_config_file;

fn remindr(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("remindr").expect("binary built");
    cmd.env("NO_COLOR", "1")
        .env("REMINDR_SESSION_BACKEND", "file")
        .env("REMINDR_SESSION_FILE", dir.path().join("session.json"))
        .env("REMINDR_API_URL", "http://127.0.0.1:9")
        .env_remove("REMINDR_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_lists_commands() {
    let dir = TempDir::new().unwrap();
    remindr(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("watch"));
}

#[test]
fn test_list_without_session_asks_to_log_in() {
    let dir = TempDir::new().unwrap();
    remindr(&dir)
        .args(["--config", "does-not-exist.yaml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("remindr login"));
}

#[test]
fn test_missing_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    remindr(&dir)
        .args(["--config", "does-not-exist.yaml", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Config file not found at does-not-exist.yaml",
        ));
}

#[test]
fn test_add_without_schedule_is_rejected_locally() {
    let dir = TempDir::new().unwrap();
    remindr(&dir)
        .args(["--config", "does-not-exist.yaml", "add", "Nap"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--date"));
}

#[test]
fn test_invalid_config_fails_validation() {
    let dir = TempDir::new().unwrap();
    let (_config_dir, config_path) = temp_config_file(
        "analysis:\n  confidence_threshold: 1.5\n",
    );
    remindr(&dir)
        .arg("--config")
        .arg(&config_path)
        .arg("whoami")
        .assert()
        .failure()
        .stderr(predicate::str::contains("confidence"));
}

#[test]
fn test_edit_rejects_conflicting_importance_flags() {
    let dir = TempDir::new().unwrap();
    remindr(&dir)
        .args(["edit", "3", "--important", "--not-important"])
        .assert()
        .failure();
}
