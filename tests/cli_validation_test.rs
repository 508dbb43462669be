//! CLI tests for the `resim` binary.
//!
//! Every command here is rejected before any request is sent, so the
//! unreachable API configured by `resim_cmd` is never contacted.

mod common;

use predicates::prelude::*;
use serde_json::Value;

use common::{resim_cmd, temp_dir};

#[test]
fn test_help_lists_nouns() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("batches"))
        .stdout(predicate::str::contains("suites"))
        .stdout(predicate::str::contains("ingest"));
}

#[test]
fn test_version() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("resim "));
}

#[test]
fn test_unknown_subcommand_is_usage_error() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args(["batches", "explode"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_malformed_flag_value_is_not_a_failed_batch() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args([
            "batches",
            "wait",
            "--project",
            "P1",
            "--batch-id",
            "b1",
            "--timeout",
            "soon",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--timeout"));
}

#[test]
fn test_sweep_parameter_name_requires_values() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args([
            "sweeps",
            "create",
            "--project",
            "P1",
            "--build-id",
            "b1",
            "--experiences",
            "E1",
            "--parameter-name",
            "speed",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("if any flags in the group"))
        .stderr(predicate::str::contains("parameter-values"));
}

#[test]
fn test_sweep_single_and_grid_are_exclusive() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args([
            "sweeps",
            "create",
            "--project",
            "P1",
            "--build-id",
            "b1",
            "--experiences",
            "E1",
            "--parameter-name",
            "speed",
            "--parameter-values",
            "1,2",
            "--grid-search-config",
            "grid.json",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mutually exclusive parameters"));
}

#[test]
fn test_allowable_failure_percent_range() {
    let dir = temp_dir();
    for value in ["101", "-1"] {
        resim_cmd(dir.path())
            .args([
                "batches",
                "create",
                "--project",
                "P1",
                "--build-id",
                "b1",
                "--experiences",
                "E1",
                "--allowable-failure-percent",
                value,
            ])
            .assert()
            .code(1)
            .stderr(predicate::str::contains(
                "allowable failure percent must be between 0 and 100",
            ));
    }
}

#[test]
fn test_batch_requires_experience_selection() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args(["batches", "create", "--project", "P1", "--build-id", "b1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("at least one of the flags in the group"));
}

#[test]
fn test_batch_get_requires_id_or_name() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args(["batches", "get", "--project", "P1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("batch-id batch-name"));
}

#[test]
fn test_exit_status_mode_prints_nothing() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args(["batches", "get", "--project", "P1", "--exit-status"])
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_missing_project_is_reported() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args(["batches", "get", "--batch-name", "nightly"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("RESIM_PROJECT"));
}

#[test]
fn test_json_errors_are_objects() {
    let dir = temp_dir();
    let output = resim_cmd(dir.path())
        .args(["batches", "get", "--project", "P1", "--json"])
        .assert()
        .code(1)
        .get_output()
        .stderr
        .clone();
    let line = String::from_utf8(output).unwrap();
    let value: Value = serde_json::from_str(line.lines().last().unwrap()).unwrap();
    assert!(value["error"].as_str().unwrap().contains("batch-id"));
}

#[test]
fn test_invalid_api_url_rejected() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .env("RESIM_URL", "not a url")
        .args(["projects", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid api URL"));
}

#[test]
fn test_incomplete_client_credentials_rejected() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .env_remove("RESIM_CLIENT_SECRET")
        .args(["projects", "list"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains(
            "Client ID and client secret must be set together",
        ));
}

#[test]
fn test_suite_get_revision_flags_exclusive() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args([
            "test-suite",
            "get",
            "--project",
            "P1",
            "--test-suite",
            "nightly",
            "--revision",
            "2",
            "--all-revisions",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("mutually exclusive parameters"));
}

#[test]
fn test_metrics_sync_without_config_fails_locally() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args(["metrics", "sync", "--project", "P1"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("config.yml"));
}

#[test]
fn test_workflow_suites_must_be_json() {
    let dir = temp_dir();
    resim_cmd(dir.path())
        .args([
            "workflows",
            "create",
            "--project",
            "P1",
            "--name",
            "nightly",
            "--description",
            "d",
            "--suites",
            "not-json",
        ])
        .assert()
        .code(1);
}
