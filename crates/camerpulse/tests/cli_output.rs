//! Integration tests for CLI output behavior
//!
//! The default behavior is quiet (no logs). Use -v/--verbose to enable logs.
//! Every test runs with HOME and the working directory pointed at a fresh
//! temp dir so stored intervals never leak between tests.

use std::path::Path;
use std::process::{Command, Output};

fn run_camerpulse(home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_camerpulse"))
        .env("HOME", home)
        .env_remove("RUST_LOG")
        .current_dir(home)
        .args(args)
        .output()
        .expect("Failed to execute camerpulse")
}

fn run_ok(home: &Path, args: &[&str]) -> Output {
    let output = run_camerpulse(home, args);
    assert!(
        output.status.success(),
        "camerpulse {:?} failed with exit code {:?}. stderr: {}",
        args,
        output.status.code(),
        String::from_utf8_lossy(&output.stderr)
    );
    output
}

fn show_json(home: &Path) -> Vec<serde_json::Value> {
    let output = run_ok(home, &["refresh", "show", "--json"]);
    serde_json::from_slice(&output.stdout).expect("refresh show --json should print JSON")
}

#[test]
fn test_refresh_show_stdout_is_clean() {
    let home = tempfile::tempdir().unwrap();
    let output = run_ok(home.path(), &["refresh", "show"]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert!(stdout.contains("sentiment_streams"));
    assert!(stdout.contains("6h"));
    assert!(
        !stdout.contains(r#""event":"#),
        "stdout should not contain JSON logs, got: {}",
        stdout
    );
    assert!(
        !stderr.contains(r#""level":"INFO""#),
        "Default mode should not emit INFO logs, got: {}",
        stderr
    );
}

#[test]
fn test_verbose_flag_emits_json_logs() {
    let home = tempfile::tempdir().unwrap();
    let output = run_ok(home.path(), &["-v", "refresh", "show"]);

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(r#""event":"core.app.startup_completed""#),
        "verbose mode should log startup, got: {}",
        stderr
    );
}

#[test]
fn test_refresh_show_json_lists_defaults() {
    let home = tempfile::tempdir().unwrap();
    let rows = show_json(home.path());

    assert_eq!(rows.len(), 8);
    let official = rows
        .iter()
        .find(|r| r["task"] == "official_profiles")
        .unwrap();
    assert_eq!(official["interval_ms"], 21_600_000);
    assert_eq!(official["source"], "default");
}

#[test]
fn test_refresh_set_then_reset() {
    let home = tempfile::tempdir().unwrap();

    let output = run_ok(home.path(), &["refresh", "set", "trend_radar", "20000"]);
    assert!(String::from_utf8_lossy(&output.stdout).contains("trend_radar now refreshes every 20s"));

    let stored = home
        .path()
        .join(".camerpulse")
        .join("refresh_config.json");
    assert!(stored.exists());

    let rows = show_json(home.path());
    let trend = rows.iter().find(|r| r["task"] == "trend_radar").unwrap();
    assert_eq!(trend["interval_ms"], 20_000);
    assert_eq!(trend["source"], "stored");
    assert_eq!(trend["tab_sensitive"], true);

    run_ok(home.path(), &["refresh", "reset"]);
    assert!(!stored.exists());

    let rows = show_json(home.path());
    let trend = rows.iter().find(|r| r["task"] == "trend_radar").unwrap();
    assert_eq!(trend["interval_ms"], 15_000);
}

#[test]
fn test_refresh_set_rejects_unknown_task() {
    let home = tempfile::tempdir().unwrap();
    let output = run_camerpulse(home.path(), &["refresh", "set", "weather", "1000"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Unknown refresh task 'weather'"),
        "got: {}",
        stderr
    );
}

#[test]
fn test_refresh_set_rejects_zero_interval() {
    let home = tempfile::tempdir().unwrap();
    let output = run_camerpulse(home.path(), &["refresh", "set", "admin_metrics", "0"]);

    assert!(!output.status.success());
    assert!(
        !home
            .path()
            .join(".camerpulse")
            .join("refresh_config.json")
            .exists()
    );
}

#[test]
fn test_refresh_history_empty() {
    let home = tempfile::tempdir().unwrap();
    let output = run_ok(home.path(), &["refresh", "history", "--json"]);
    let records: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert!(records.is_empty());

    let output = run_ok(home.path(), &["refresh", "history"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("apps running the refresh orchestrator"),
        "got: {}",
        stdout
    );
}

#[test]
fn test_listen_rejects_non_websocket_url() {
    let home = tempfile::tempdir().unwrap();
    let output = run_camerpulse(home.path(), &["listen", "--url", "http://localhost:1"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Invalid channel url"), "got: {}", stderr);
}

#[test]
fn test_completions_bash() {
    let home = tempfile::tempdir().unwrap();
    let output = run_ok(home.path(), &["completions", "bash"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("camerpulse"));
    assert!(stdout.contains("refresh"));
}
