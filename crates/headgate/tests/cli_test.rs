//! Integration tests for the `headgate` CLI binary.
//!
//! These tests validate argument parsing, help output, shell completions,
//! and error handling without requiring a live backend.
#![allow(clippy::unwrap_used)]

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────

/// Build a [`Command`] for the `headgate` binary with env isolation.
///
/// Clears all `HEADGATE_*` env vars and points config/data directories
/// at a nonexistent path so tests never touch the user's real
/// configuration or stored session.
fn headgate_cmd() -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("headgate");
    cmd.env("HOME", "/tmp/headgate-test-nonexistent")
        .env("XDG_CONFIG_HOME", "/tmp/headgate-test-nonexistent")
        .env("XDG_DATA_HOME", "/tmp/headgate-test-nonexistent")
        .env_remove("HEADGATE_PROFILE")
        .env_remove("HEADGATE_BACKEND")
        .env_remove("HEADGATE_USERNAME")
        .env_remove("HEADGATE_PASSWORD")
        .env_remove("HEADGATE_OUTPUT")
        .env_remove("HEADGATE_INSECURE")
        .env_remove("HEADGATE_TIMEOUT");
    cmd
}

/// Same isolation, but under a real (writable) home so config
/// mutations round-trip.
fn headgate_cmd_at(home: &std::path::Path) -> assert_cmd::Command {
    let mut cmd = headgate_cmd();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home)
        .env("XDG_DATA_HOME", home);
    cmd
}

/// Concatenate stdout + stderr from a command output for flexible matching.
fn combined_output(output: &std::process::Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    format!("{stdout}{stderr}")
}

// ── Basic invocation ────────────────────────────────────────────────

#[test]
fn test_no_args_shows_help() {
    let output = headgate_cmd().output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected exit code 2");
    let text = combined_output(&output);
    assert!(text.contains("Usage"), "Expected 'Usage' in output:\n{text}");
}

#[test]
fn test_help_flag() {
    headgate_cmd().arg("--help").assert().success().stdout(
        predicate::str::contains("irrigation")
            .and(predicate::str::contains("motor"))
            .and(predicate::str::contains("valve"))
            .and(predicate::str::contains("devices")),
    );
}

#[test]
fn test_version_flag() {
    headgate_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("headgate"));
}

// ── Shell completions ───────────────────────────────────────────────

#[test]
fn test_completions_bash() {
    headgate_cmd()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

#[test]
fn test_completions_zsh() {
    headgate_cmd()
        .args(["completions", "zsh"])
        .assert()
        .success()
        .stdout(predicate::str::contains("#compdef"));
}

#[test]
fn test_completions_fish() {
    headgate_cmd()
        .args(["completions", "fish"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty().not());
}

// ── Error cases ─────────────────────────────────────────────────────

#[test]
fn test_invalid_subcommand() {
    let output = headgate_cmd().arg("foobar").output().unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid subcommand"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid") || text.contains("unrecognized") || text.contains("foobar"),
        "Expected error mentioning invalid subcommand:\n{text}"
    );
}

#[test]
fn test_motor_start_without_config() {
    headgate_cmd()
        .args(["motor", "start"])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("config")
                .or(predicate::str::contains("Configuration"))
                .or(predicate::str::contains("profile")),
        );
}

#[test]
fn test_devices_without_config() {
    headgate_cmd().arg("devices").assert().failure().stderr(
        predicate::str::contains("config")
            .or(predicate::str::contains("Configuration"))
            .or(predicate::str::contains("profile")),
    );
}

#[test]
fn test_logout_without_session_is_fine() {
    headgate_cmd()
        .arg("logout")
        .assert()
        .success()
        .stderr(predicate::str::contains("Nobody was signed in"));
}

#[test]
fn test_config_show_no_config() {
    // `config show` uses load_config_or_default() so it succeeds even
    // when no config file exists; it just renders the default config.
    headgate_cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[defaults]"));
}

#[test]
fn test_invalid_output_format() {
    let output = headgate_cmd()
        .args(["--output", "invalid", "devices"])
        .output()
        .unwrap();
    assert!(
        !output.status.success(),
        "Expected failure for invalid output format"
    );
    let text = combined_output(&output);
    assert!(
        text.contains("invalid")
            || text.contains("possible values")
            || text.contains("valid value"),
        "Expected error about valid output formats:\n{text}"
    );
}

#[test]
fn test_global_flags_parsing() {
    // All flags should parse; the failure should be about missing
    // backend config, not about argument parsing.
    headgate_cmd()
        .args([
            "--output",
            "json",
            "--verbose",
            "--insecure",
            "--timeout",
            "60",
            "devices",
        ])
        .assert()
        .failure()
        .stderr(
            predicate::str::contains("config")
                .or(predicate::str::contains("Configuration"))
                .or(predicate::str::contains("profile")),
        );
}

#[test]
fn test_map_requires_both_imeis() {
    let output = headgate_cmd().arg("map").output().unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage error");
    let text = combined_output(&output);
    assert!(
        text.contains("MOTOR_IMEI"),
        "Expected missing-argument error:\n{text}"
    );
}

#[test]
fn test_schedule_requires_start_and_stop() {
    let output = headgate_cmd()
        .args(["motor", "schedule", "--start", "08:30"])
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2), "Expected usage error");
    let text = combined_output(&output);
    assert!(
        text.contains("--stop"),
        "Expected missing --stop error:\n{text}"
    );
}

// ── Config file round trips ─────────────────────────────────────────

#[test]
fn test_config_set_then_show() {
    let home = tempfile::tempdir().unwrap();

    headgate_cmd_at(home.path())
        .args(["config", "set", "backend", "https://backend.example.com/api"])
        .assert()
        .success();

    headgate_cmd_at(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("backend.example.com"));
}

#[test]
fn test_config_set_rejects_unknown_key() {
    let home = tempfile::tempdir().unwrap();

    headgate_cmd_at(home.path())
        .args(["config", "set", "flux_capacitor", "on"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("flux_capacitor"));
}

#[test]
fn test_config_use_unknown_profile_fails() {
    let home = tempfile::tempdir().unwrap();

    headgate_cmd_at(home.path())
        .args(["config", "use", "nope"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("nope"));
}

#[test]
fn test_profile_flag_selects_missing_profile() {
    let home = tempfile::tempdir().unwrap();

    // Seed a config with only a "default" profile...
    headgate_cmd_at(home.path())
        .args(["config", "set", "backend", "https://backend.example.com/api"])
        .assert()
        .success();

    // ...then ask for one that does not exist.
    headgate_cmd_at(home.path())
        .args(["--profile", "lab", "devices"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("lab").and(predicate::str::contains("default")));
}

#[test]
fn test_pump_alias() {
    headgate_cmd()
        .args(["pump", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("schedule"));
}

#[test]
fn test_gv_alias() {
    headgate_cmd()
        .args(["gv", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("set-default"));
}

// ── Subcommand help discovery ───────────────────────────────────────

#[test]
fn test_motor_subcommands_exist() {
    headgate_cmd()
        .args(["motor", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("status")
                .and(predicate::str::contains("start"))
                .and(predicate::str::contains("stop"))
                .and(predicate::str::contains("schedule")),
        );
}

#[test]
fn test_valve_subcommands_exist() {
    headgate_cmd()
        .args(["valve", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("list")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("start"))
                .and(predicate::str::contains("stop"))
                .and(predicate::str::contains("set-default")),
        );
}

#[test]
fn test_config_subcommands_exist() {
    headgate_cmd()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(
            predicate::str::contains("init")
                .and(predicate::str::contains("show"))
                .and(predicate::str::contains("profiles")),
        );
}
