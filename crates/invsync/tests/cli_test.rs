//! Integration tests for the `invsync` binary.
//!
//! None of these reach a hub or hardware plugin; stores live in temp dirs.
#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

const CLOUD: &str = "6575154a-72fc-4ed8-9a87-a81885ab38bb";

// ── Helpers ─────────────────────────────────────────────────────────

/// `invsync` with an isolated environment.
fn invsync_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("invsync");
    cmd.env("HOME", "/tmp/invsync-cli-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/invsync-cli-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/invsync-cli-test-nonexistent")
        .env_remove("RUST_LOG")
        .env_remove("INVSYNC_CONFIG")
        .env_remove("INVSYNC_OUTPUT")
        .env_remove("INVSYNC_CLOUD_ID")
        .env_remove("INVSYNC_DATABASE");
    cmd
}

fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let db = dir.join("inventory.db");
    let path = dir.join("config.toml");
    std::fs::write(
        &path,
        format!(
            "cloud_id = \"{CLOUD}\"\ndatabase = \"{}\"\n{extra}",
            db.display()
        ),
    )
    .unwrap();
    path
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn no_args_shows_help() {
    let output = invsync_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(text.contains("Usage"), "unexpected output:\n{text}");
}

#[test]
fn help_lists_subcommands() {
    invsync_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("run")
            .and(predicate::str::contains("data-sources"))
            .and(predicate::str::contains("events")),
    );
}

#[test]
fn version_flag() {
    invsync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("invsync"));
}

#[test]
fn completions_bash() {
    invsync_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Config ──────────────────────────────────────────────────────────

#[test]
fn config_path_defaults_to_platform_dir() {
    invsync_cmd()
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn config_path_honors_flag() {
    invsync_cmd()
        .args(["--config", "/etc/invsync/custom.toml", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/etc/invsync/custom.toml"));
}

#[test]
fn config_show_redacts_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        dir.path(),
        "[hub]\nurl = \"https://hub.example:6443\"\ntoken = \"very-secret\"\n",
    );
    invsync_cmd()
        .args(["--config", path.to_str().unwrap(), "config", "show"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("<redacted>")
                .and(predicate::str::contains("very-secret").not())
                .and(predicate::str::contains(CLOUD)),
        );
}

#[test]
fn missing_cloud_id_is_a_usage_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "poll_interval_secs = 60\n").unwrap();

    invsync_cmd()
        .args(["--config", path.to_str().unwrap(), "run"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("cloud_id"));
}

// ── Store inspection ────────────────────────────────────────────────

#[test]
fn data_sources_on_fresh_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");
    invsync_cmd()
        .args(["--config", path.to_str().unwrap(), "-o", "json", "data-sources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn data_sources_table_has_headers() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");
    invsync_cmd()
        .args(["--config", path.to_str().unwrap(), "data-sources"])
        .assert()
        .success()
        .stdout(predicate::str::contains("NAME").and(predicate::str::contains("GENERATION")));
}

#[test]
fn events_on_fresh_store_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "");
    invsync_cmd()
        .args([
            "--config",
            path.to_str().unwrap(),
            "-o",
            "json",
            "events",
            "--after",
            "0",
            "--limit",
            "10",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}
