//! End-to-end tests for the conductor binary
//!
//! Each test writes a conductor.toml whose tests run small shell commands,
//! then checks output and exit codes of:
//! - `conductor run`
//! - `conductor order`
//! - `conductor list`

use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Test Helpers
// ============================================================================

/// Create a temporary project with the given conductor.toml
fn create_project(config: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("conductor.toml"), config).unwrap();
    temp_dir
}

fn conductor(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("conductor");
    cmd.current_dir(dir.path())
        .env("NO_COLOR", "1")
        .env_remove("CONDUCTOR_JSON")
        .env_remove("CONDUCTOR_MAX_CONCURRENT_SUITES")
        .env_remove("CONDUCTOR_TEST_TIMEOUT_MS")
        .env_remove("CONDUCTOR_RETRY_FAILED_TESTS")
        .env_remove("CONDUCTOR_HALT_ON_CRITICAL_FAILURE");
    cmd
}

const PASSING: &str = r#"
[orchestrator]
retry_backoff_ms = 1

[[suite]]
id = "core"

[[suite.test]]
id = "boot"
kind = "performance"
config = { command = ["true"] }

[[suite]]
id = "ui"
dependencies = ["core"]
parallel = true

[[suite.test]]
id = "camera"
kind = "cross-modal"
modality = "camera"
config = { command = ["true"] }

[[suite.test]]
id = "voice"
kind = "cross-modal"
modality = "voice"
config = { command = "exit 0" }
"#;

const CRITICAL_FAILURE: &str = r#"
[orchestrator]
retry_failed_tests = false

[[suite]]
id = "A"

[[suite.test]]
id = "login"
kind = "handoff"
critical = true
config = { command = ["false"] }

[[suite]]
id = "B"
dependencies = ["A"]

[[suite.test]]
id = "checkout"
kind = "handoff"
config = { command = ["true"] }
"#;

// ============================================================================
// conductor run
// ============================================================================

#[test]
fn test_run_passing_project() {
    let dir = create_project(PASSING);

    conductor(&dir)
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("PASS core"))
        .stdout(predicate::str::contains("PASS ui"))
        .stdout(predicate::str::contains("Run result: PASSED"));
}

#[test]
fn test_run_json_report() {
    let dir = create_project(PASSING);

    let output = conductor(&dir).args(["run", "--json"]).output().unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["status"], "PASS");
    assert_eq!(report["summary"]["totalTests"], 3);
    assert_eq!(report["suiteResults"][0]["suiteId"], "core");
    assert_eq!(report["suiteResults"][1]["suiteId"], "ui");
    assert_eq!(report["coverage"]["modalities"]["camera"], 100.0);
    assert_eq!(report["coverage"]["modalities"]["voice"], 100.0);
}

#[test]
fn test_run_critical_failure_exits_nonzero() {
    let dir = create_project(CRITICAL_FAILURE);

    let output = conductor(&dir).args(["run", "--json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["summary"]["status"], "FAIL");
    assert_eq!(report["halted"], true);
    assert_eq!(report["notRun"], serde_json::json!(["B"]));
    assert_eq!(report["suiteResults"].as_array().unwrap().len(), 1);
}

#[test]
fn test_run_no_halt_runs_dependents() {
    let dir = create_project(CRITICAL_FAILURE);

    conductor(&dir)
        .args(["run", "--no-halt"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("FAIL A"))
        .stdout(predicate::str::contains("PASS B"))
        .stdout(predicate::str::contains("command exited with status 1"));
}

#[test]
fn test_run_with_explicit_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("ci.toml");
    fs::write(&path, PASSING).unwrap();

    conductor(&dir)
        .args(["run", "--config"])
        .arg(&path)
        .assert()
        .success();
}

#[test]
fn test_run_timeout_from_env() {
    let dir = create_project(
        r#"
[[suite]]
id = "slow"

[[suite.test]]
id = "sleepy"
kind = "performance"
critical = true
retries = 0
config = { command = ["sleep", "5"] }
"#,
    );

    conductor(&dir)
        .args(["run", "--json"])
        .env("CONDUCTOR_TEST_TIMEOUT_MS", "100")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("timeout after 100ms"));
}

#[test]
fn test_run_cycle_is_error() {
    let dir = create_project(
        r#"
[[suite]]
id = "a"
dependencies = ["b"]

[[suite]]
id = "b"
dependencies = ["a"]
"#,
    );

    conductor(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cyclic dependency"));
}

#[test]
fn test_run_unknown_kind_is_error() {
    let dir = create_project(
        r#"
[[suite]]
id = "s"

[[suite.test]]
id = "t"
kind = "telepathy"
"#,
    );

    conductor(&dir)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("telepathy"));
}

#[test]
fn test_run_invalid_env_override_is_error() {
    let dir = create_project(PASSING);

    conductor(&dir)
        .arg("run")
        .env("CONDUCTOR_MAX_CONCURRENT_SUITES", "lots")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONDUCTOR_MAX_CONCURRENT_SUITES"));
}

// ============================================================================
// conductor order / list
// ============================================================================

#[test]
fn test_order_json() {
    let dir = create_project(PASSING);

    let output = conductor(&dir).args(["order", "--json"]).output().unwrap();
    assert!(output.status.success());

    let order: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(order["order"], serde_json::json!(["core", "ui"]));
    assert_eq!(order["levels"], serde_json::json!([["core"], ["ui"]]));
}

#[test]
fn test_order_text() {
    let dir = create_project(PASSING);

    conductor(&dir)
        .arg("order")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. core"))
        .stdout(predicate::str::contains("2. ui (after core)"));
}

#[test]
fn test_list_suites() {
    let dir = create_project(CRITICAL_FAILURE);

    conductor(&dir)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("login [handoff] critical"))
        .stdout(predicate::str::contains("depends on: A"))
        .stdout(predicate::str::contains("2 suites, 2 tests"));
}
