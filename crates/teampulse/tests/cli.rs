//! End-to-end CLI integration tests
//!
//! These tests invoke the compiled binary as a subprocess to verify
//! that the CLI behaves correctly from a user's perspective. Nothing here
//! touches the network: collection tests stop at validation or range
//! parsing, both of which fail before any upstream client is used.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
///
/// Note: `cargo_bin` is marked deprecated for edge cases involving custom
/// cargo build directories, but works correctly for standard project layouts.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

/// A config that passes validation (but points at unroutable hosts).
const VALID_CONFIG: &str = r#"
source_control:
  token: tok
  organization: acme
tracker:
  environments:
    prod:
      server: https://tracker.invalid
      username: svc
      api_token: secret
teams:
  - name: Platform
    members:
      - name: Alice
        sc_login: alice
        tracker_login: alice.t
    repo_selector:
      prefixes: [platform-]
    filter_ids:
      wip: 101
    project_keys: [PLAT]
"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_shows_usage() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("collect"))
        .stdout(predicate::str::contains("Options:"));
}

#[test]
fn short_help_flag_shows_usage() {
    cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage:"));
}

#[test]
fn version_flag_shows_version() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn collect_help_documents_range_and_env() {
    cmd()
        .args(["collect", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--date-range"))
        .stdout(predicate::str::contains("--env"))
        .stdout(predicate::str::contains("90d"));
}

// =============================================================================
// Collect: exit codes without network
// =============================================================================

#[test]
fn collect_without_credentials_exits_one() {
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "collect"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("token"));
}

#[test]
fn collect_with_bad_range_exits_one() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".teampulse.yaml"), VALID_CONFIG).unwrap();

    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "collect",
            "--date-range",
            "0d",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid date range"));
}

#[test]
fn collect_with_unknown_environment_exits_one() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".teampulse.yaml"), VALID_CONFIG).unwrap();

    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "collect",
            "--env",
            "staging",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown tracker environment"));
}

#[test]
fn collect_rejects_garbage_range_spec() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".teampulse.yaml"), VALID_CONFIG).unwrap();

    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "collect",
            "--date-range",
            "lastmonth",
        ])
        .assert()
        .code(1);
}

// =============================================================================
// Show
// =============================================================================

#[test]
fn show_lists_nothing_on_fresh_data_dir() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::write(
        tmp.path().join(".teampulse.toml"),
        format!(
            r#"
[collection]
data_dir = "{}"
"#,
            data_dir.display()
        ),
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No snapshots"));
}

#[test]
fn show_missing_snapshot_exits_one() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::write(
        tmp.path().join(".teampulse.toml"),
        format!(
            r#"
[collection]
data_dir = "{}"
"#,
            data_dir.display()
        ),
    )
    .unwrap();

    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "show",
            "--date-range",
            "90d",
            "--env",
            "prod",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("no snapshot"));
}

#[test]
fn show_json_lists_empty_array() {
    let tmp = TempDir::new().unwrap();
    let data_dir = tmp.path().join("data");
    fs::write(
        tmp.path().join(".teampulse.toml"),
        format!(
            r#"
[collection]
data_dir = "{}"
"#,
            data_dir.display()
        ),
    )
    .unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "--json", "show"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("show --json should output valid JSON");
    assert!(json.as_array().unwrap().is_empty());
}

// =============================================================================
// Global Flags
// =============================================================================

#[test]
fn quiet_flag_accepted() {
    cmd().args(["--quiet", "doctor"]).assert().success();
}

#[test]
fn short_quiet_flag_accepted() {
    cmd().args(["-q", "doctor"]).assert().success();
}

#[test]
fn verbose_flag_accepted() {
    cmd().args(["--verbose", "doctor"]).assert().success();
}

#[test]
fn multiple_verbose_flags_accepted() {
    cmd().args(["-vv", "doctor"]).assert().success();
}

#[test]
fn color_never_accepted() {
    cmd().args(["--color", "never", "doctor"]).assert().success();
}

#[test]
fn log_file_flag_accepted() {
    let tmp = TempDir::new().unwrap();
    let log_path = tmp.path().join("run.jsonl");

    cmd()
        .args([
            "-C",
            tmp.path().to_str().unwrap(),
            "--log-file",
            log_path.to_str().unwrap(),
            "doctor",
        ])
        .assert()
        .success();

    // The daily appender suffixes the date, so look for the prefix
    let found = fs::read_dir(tmp.path()).unwrap().any(|entry| {
        entry
            .unwrap()
            .file_name()
            .to_string_lossy()
            .starts_with("run.jsonl")
    });
    assert!(found, "log file should be created");
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn no_subcommand_shows_help() {
    cmd()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn invalid_subcommand_shows_error() {
    cmd()
        .arg("not-a-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

#[test]
fn invalid_flag_shows_error() {
    cmd()
        .arg("--not-a-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error:"));
}

// =============================================================================
// Chdir Flag
// =============================================================================

#[test]
fn chdir_flag_changes_directory() {
    cmd().args(["-C", "/tmp", "doctor"]).assert().success();
}

#[test]
fn chdir_nonexistent_fails() {
    cmd()
        .args(["-C", "/nonexistent/path/that/does/not/exist", "doctor"])
        .assert()
        .failure();
}
