//! CLI integration tests
//!
//! Tests the tunwall CLI using assert_cmd. Every test runs against an
//! isolated base directory so no test touches ~/.tunwall or the network.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tunwall() -> Command {
    Command::cargo_bin("tunwall")
        .expect("Failed to locate tunwall binary - ensure it's built before running tests")
}

#[test]
fn test_cli_help() {
    tunwall()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("tunwall"))
        .stdout(predicate::str::contains(
            "Supervised single-session VPN tunnel",
        ));
}

#[test]
fn test_cli_version() {
    tunwall()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("tunwall"));
}

#[test]
fn test_cli_start_help() {
    tunwall()
        .args(["start", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("firewall"));
}

#[test]
fn test_cli_config_help() {
    tunwall()
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_cli_unknown_command() {
    tunwall()
        .arg("nonexistent-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_cli_config_init_and_show() {
    let dir = TempDir::new().unwrap();

    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy()])
        .args(["config", "init"])
        .assert()
        .success();

    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy()])
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("option_set"));
}

#[test]
fn test_cli_config_init_refuses_overwrite() {
    let dir = TempDir::new().unwrap();
    let base = dir.path().to_string_lossy().into_owned();

    tunwall()
        .args(["--base-dir", &base, "config", "init"])
        .assert()
        .success();

    // Second init without --force leaves the file alone
    tunwall()
        .args(["--base-dir", &base, "config", "init"])
        .assert()
        .success()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_cli_verbose_enables_debug_logging() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .env_remove("RUST_LOG")
        .args(["--base-dir", &dir.path().to_string_lossy()])
        .args(["-vv", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using base directory"));
}

#[test]
fn test_cli_quiet_suppresses_debug_logging() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .env_remove("RUST_LOG")
        .args(["--base-dir", &dir.path().to_string_lossy()])
        .args(["--quiet", "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Using base directory").not());
}

#[test]
fn test_cli_config_path() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy()])
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tunwall.toml"));
}

#[test]
fn test_cli_status_runs_without_state() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy(), "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tunwall.pid"));
}

#[test]
fn test_cli_servers_empty_catalog_fails() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy(), "servers"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No server configurations"));
}

#[test]
fn test_cli_servers_lists_installed_bundles() {
    let dir = TempDir::new().unwrap();
    let udp_dir = dir.path().join("configuration").join("udp");
    std::fs::create_dir_all(&udp_dir).unwrap();
    std::fs::write(udp_dir.join("CA Toronto.ovpn"), "remote 10.0.0.1 1198\n").unwrap();

    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy(), "servers"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CA Toronto"));
}

#[test]
fn test_cli_stop_without_running_tunnel_fails() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy(), "stop"])
        .assert()
        .failure();
}

#[test]
fn test_cli_start_without_config_fails() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy(), "start"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("config"));
}

#[test]
fn test_cli_log_without_log_file() {
    let dir = TempDir::new().unwrap();
    tunwall()
        .args(["--base-dir", &dir.path().to_string_lossy(), "log"])
        .assert()
        .success()
        .stderr(predicate::str::contains("No tunnel log"));
}
