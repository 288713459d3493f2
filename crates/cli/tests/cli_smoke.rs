//! CLI smoke tests for cadence.
//!
//! These tests run the binary against small build files and check exit codes
//! and the summary printed by the completion hooks.

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get a Command for the cadence binary, isolated from the caller's environment.
fn cadence_cmd() -> Command {
  let mut cmd = cargo_bin_cmd!("cadence");
  cmd
    .env_remove("CADENCE_BUILD_FILE")
    .env_remove("CADENCE_PARALLELISM")
    .env_remove("CADENCE_SHELL")
    .env_remove("RUST_LOG");
  cmd
}

/// Create a temp directory with a `cadence.json` build file.
fn temp_build(content: &str) -> TempDir {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("cadence.json"), content).unwrap();
  temp
}

/// Lifecycle tasks only; nothing is spawned.
const LIFECYCLE_BUILD: &str = r#"{
  "defaultTasks": ["build"],
  "properties": { "profile": "debug" },
  "projects": {
    "lib": { "dir": ".", "tasks": { "build": { "description": "Build the library" } } },
    "app": {
      "dir": ".",
      "tasks": {
        "build": { "description": "Build the app", "dependsOn": ["lib:build"] },
        "check": {}
      }
    }
  }
}"#;

/// A task that exits with status 3, and one depending on it.
const FAILING_BUILD: &str = r#"{
  "projects": {
    "app": {
      "dir": ".",
      "tasks": {
        "compile": { "command": "exit 3" },
        "build": { "dependsOn": ["compile"] }
      }
    }
  }
}"#;

// =============================================================================
// Help & Version
// =============================================================================

#[test]
fn help_flag_works() {
  cadence_cmd()
    .arg("--help")
    .assert()
    .success()
    .stdout(predicate::str::contains("Usage"));
}

#[test]
fn version_flag_works() {
  cadence_cmd()
    .arg("--version")
    .assert()
    .success()
    .stdout(predicate::str::contains("cadence"));
}

#[test]
fn subcommand_help_works() {
  for cmd in &["run", "configure", "tasks"] {
    cadence_cmd()
      .arg(cmd)
      .arg("--help")
      .assert()
      .success()
      .stdout(predicate::str::contains("Usage"));
  }
}

// =============================================================================
// run
// =============================================================================

#[test]
fn run_default_tasks_succeeds() {
  let temp = temp_build(LIFECYCLE_BUILD);

  cadence_cmd()
    .arg("run")
    .arg("-p")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("BUILD SUCCESSFUL"))
    .stdout(predicate::str::contains("Succeeded: 2"));
}

#[test]
fn run_selected_task() {
  let temp = temp_build(LIFECYCLE_BUILD);

  cadence_cmd()
    .args(["run", "app:check", "-p"])
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Succeeded: 1"));
}

#[test]
fn run_failing_task_exits_non_zero() {
  let temp = temp_build(FAILING_BUILD);

  cadence_cmd()
    .args(["run", "app:build", "-p"])
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("app:compile"))
    .stderr(predicate::str::contains("BUILD FAILED"))
    .stderr(predicate::str::contains("app:build not run"));
}

#[test]
fn dry_run_does_not_execute_commands() {
  let temp = temp_build(FAILING_BUILD);

  cadence_cmd()
    .args(["run", "app:build", "--dry-run", "-p"])
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Succeeded: 2"));
}

#[test]
fn run_unknown_task_fails() {
  let temp = temp_build(LIFECYCLE_BUILD);

  cadence_cmd()
    .args(["run", "deploy", "-p"])
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("deploy"));
}

#[test]
fn run_without_build_file_fails() {
  let temp = TempDir::new().unwrap();

  cadence_cmd()
    .arg("run")
    .arg("-p")
    .arg(temp.path())
    .assert()
    .failure()
    .stderr(predicate::str::contains("build file not found"));
}

// =============================================================================
// configure
// =============================================================================

#[test]
fn configure_prints_model() {
  let temp = temp_build(LIFECYCLE_BUILD);

  cadence_cmd()
    .arg("configure")
    .arg("-p")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("Projects: 2"))
    .stdout(predicate::str::contains("Tasks: 3"))
    .stdout(predicate::str::contains("profile = debug"));
}

#[test]
fn configure_json_applies_properties() {
  let temp = temp_build(LIFECYCLE_BUILD);

  let assert = cadence_cmd()
    .args(["configure", "-o", "json", "-P", "profile=release", "-p"])
    .arg(temp.path())
    .assert()
    .success();

  let model: serde_json::Value = serde_json::from_slice(&assert.get_output().stdout).unwrap();
  assert_eq!(model["parameters"]["profile"], "release");
  assert_eq!(model["default_tasks"][0], "build");
  assert!(model["projects"]["app"]["tasks"]["build"].is_object());
}

#[test]
fn configure_does_not_run_tasks() {
  let temp = temp_build(FAILING_BUILD);

  cadence_cmd()
    .arg("configure")
    .arg("-p")
    .arg(temp.path())
    .assert()
    .success();
}

#[test]
fn configure_uses_build_file_from_env() {
  let temp = TempDir::new().unwrap();
  std::fs::write(temp.path().join("ci.json"), LIFECYCLE_BUILD).unwrap();

  cadence_cmd()
    .arg("configure")
    .arg("-p")
    .arg(temp.path())
    .env("CADENCE_BUILD_FILE", "ci.json")
    .assert()
    .success()
    .stdout(predicate::str::contains("Projects: 2"));
}

#[test]
fn invalid_property_is_rejected() {
  cadence_cmd()
    .args(["configure", "-P", "no-equals-sign"])
    .assert()
    .failure();
}

// =============================================================================
// tasks
// =============================================================================

#[test]
fn tasks_lists_descriptions_and_dependencies() {
  let temp = temp_build(LIFECYCLE_BUILD);

  cadence_cmd()
    .arg("tasks")
    .arg("-p")
    .arg(temp.path())
    .assert()
    .success()
    .stdout(predicate::str::contains("app:build"))
    .stdout(predicate::str::contains("Build the library"))
    .stdout(predicate::str::contains("lib:build"));
}
