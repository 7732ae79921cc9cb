//! Configuration integration tests.
//!
//! These tests verify config discovery, format parsing, and precedence
//! from an end-to-end perspective using the compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Returns a Command configured to run our binary.
#[allow(deprecated)]
fn cmd() -> Command {
    Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

// =============================================================================
// Config File Discovery
// =============================================================================

#[test]
fn runs_without_config_file() {
    // The CLI should work even when no config file exists
    let tmp = TempDir::new().unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

#[test]
fn discovers_dotfile_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join(".teampulse.toml");
    fs::write(&config_path, r#"log_level = "debug""#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains(".teampulse.toml"));
}

#[test]
fn discovers_regular_config_in_current_dir() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("teampulse.toml");
    fs::write(&config_path, r#"log_level = "warn""#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("teampulse.toml"));
}

#[test]
fn discovers_config_in_parent_directory() {
    let tmp = TempDir::new().unwrap();
    let sub_dir = tmp.path().join("nested").join("deep");
    fs::create_dir_all(&sub_dir).unwrap();

    // Config in root, run from nested/deep
    let config_path = tmp.path().join(".teampulse.toml");
    fs::write(&config_path, r#"log_level = "debug""#).unwrap();

    cmd()
        .args(["-C", sub_dir.to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

// =============================================================================
// Config Format Parsing
// =============================================================================

#[test]
fn parses_toml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".teampulse.toml"),
        r#"
log_level = "warn"

[source_control]
token = "tok"
organization = "acme"
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

#[test]
fn parses_yaml_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".teampulse.yaml"),
        r#"
log_level: warn
source_control:
  token: tok
  organization: acme
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

#[test]
fn parses_json_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".teampulse.json"),
        r#"{"log_level": "error"}"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

// =============================================================================
// Validation Surface
// =============================================================================

#[test]
fn doctor_reports_incomplete_config_without_failing() {
    // An empty config is diagnosable but not collectable
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".teampulse.toml"), r#"log_level = "info""#).unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("token"));
}

#[test]
fn doctor_json_includes_validation_error() {
    let tmp = TempDir::new().unwrap();

    let output = cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "--json", "doctor"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&output.get_output().stdout);
    let json: serde_json::Value =
        serde_json::from_str(&stdout).expect("doctor --json should output valid JSON");
    assert!(json["config"]["validation_error"].is_string());
}

#[test]
fn doctor_accepts_full_team_config() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".teampulse.yaml"),
        r#"
source_control:
  token: tok
  organization: acme
tracker:
  environments:
    prod:
      server: https://tracker.acme.example
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
      bugs: 102
      completed: 103
      incidents: 104
    project_keys: [PLAT]
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Platform"))
        .stdout(predicate::str::contains("collectable"));
}

// =============================================================================
// Error Cases
// =============================================================================

#[test]
fn invalid_toml_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".teampulse.toml"),
        "this is not valid toml [[[",
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration").or(predicate::str::contains("config")));
}

#[test]
fn invalid_json_config_shows_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join(".teampulse.json"), "{not valid json}").unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .failure();
}

#[test]
fn unknown_config_field_is_ignored() {
    // Figment ignores unknown fields by default with serde
    let tmp = TempDir::new().unwrap();
    fs::write(
        tmp.path().join(".teampulse.toml"),
        r#"
log_level = "info"
unknown_field = "should be ignored"
another_unknown = 42
"#,
    )
    .unwrap();

    cmd()
        .args(["-C", tmp.path().to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

// =============================================================================
// Boundary Marker Tests
// =============================================================================

#[test]
fn git_boundary_stops_config_search() {
    let tmp = TempDir::new().unwrap();

    let parent = tmp.path().join("parent");
    let repo = parent.join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();

    // Config in parent (outside repo)
    fs::write(parent.join(".teampulse.toml"), r#"log_level = "error""#).unwrap();

    // .git directory marks repo boundary
    fs::create_dir(repo.join(".git")).unwrap();

    // Running from src/ should NOT find parent config (stopped at .git)
    // The CLI should still work, just with defaults
    cmd()
        .args(["-C", src.to_str().unwrap(), "doctor"])
        .assert()
        .success();
}

#[test]
fn config_in_same_dir_as_git_is_found() {
    let tmp = TempDir::new().unwrap();
    let repo = tmp.path().join("repo");
    let src = repo.join("src");
    fs::create_dir_all(&src).unwrap();

    // .git and config in same directory
    fs::create_dir(repo.join(".git")).unwrap();
    fs::write(repo.join(".teampulse.toml"), r#"log_level = "debug""#).unwrap();

    // Running from src/ should find the repo config
    cmd()
        .args(["-C", src.to_str().unwrap(), "doctor"])
        .assert()
        .success();
}
