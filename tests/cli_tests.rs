//! CLI and basic command tests

mod common;

use common::{add_unit, gtrack, json, setup_test_project};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

// ============================================================================
// CLI Basic Tests
// ============================================================================

#[test]
fn test_help_displays() {
    gtrack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("equipment exports"));
}

#[test]
fn test_version_displays() {
    gtrack()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("gtrack"));
}

#[test]
fn test_unknown_command_fails() {
    gtrack()
        .arg("unknown-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_completions_bash() {
    gtrack()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("gtrack"));
}

// ============================================================================
// Init Command Tests
// ============================================================================

#[test]
fn test_init_creates_config_and_database() {
    let tmp = TempDir::new().unwrap();
    let db = tmp.path().join("data").join("gt.db");

    gtrack()
        .current_dir(tmp.path())
        .args(["init", "--drive", "/nonexistent/drive", "--db"])
        .arg(&db)
        .assert()
        .success()
        .stdout(predicate::str::contains("Wrote config"))
        .stdout(predicate::str::contains("not found"));

    assert!(tmp.path().join("guesttracker.yaml").exists());
    assert!(db.exists());

    let config = fs::read_to_string(tmp.path().join("guesttracker.yaml")).unwrap();
    assert!(config.contains("/nonexistent/drive"));
}

#[test]
fn test_init_keeps_existing_config() {
    let tmp = setup_test_project();
    let before = fs::read_to_string(tmp.path().join("guesttracker.yaml")).unwrap();

    gtrack()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));

    let after = fs::read_to_string(tmp.path().join("guesttracker.yaml")).unwrap();
    assert_eq!(before, after);
    assert!(tmp.path().join("gt.db").exists());
}

#[test]
fn test_invalid_config_reports_error() {
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("guesttracker.yaml"), "drive: [unclosed\n").unwrap();

    gtrack()
        .current_dir(tmp.path())
        .args(["units", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration error"));
}

// ============================================================================
// Units Command Tests
// ============================================================================

#[test]
fn test_units_add_and_list() {
    let tmp = setup_test_project();
    add_unit(&tmp);

    gtrack()
        .current_dir(tmp.path())
        .args(["units", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("F301"))
        .stdout(predicate::str::contains("A40017"));

    let units = json(gtrack().current_dir(tmp.path()).args(["units", "list", "--paths"]));
    let units = units.as_array().unwrap();
    assert_eq!(units.len(), 1);
    assert_eq!(units[0]["model"], "980E-4");
    assert!(units[0]["folder"].as_str().unwrap().ends_with("F301 - A40017"));
}

#[test]
fn test_units_list_empty() {
    let tmp = setup_test_project();

    gtrack()
        .current_dir(tmp.path())
        .args(["units", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No units found"));
}

#[test]
fn test_units_import_csv() {
    let tmp = setup_test_project();
    let csv = tmp.path().join("units.csv");
    fs::write(
        &csv,
        "Unit,Serial,Model,ModelBase,MineSite\n\
F301,A40017,980E-4,980E,FortHills\n\
F302,A40018,980E-4,980E,FortHills\n\
bad row\n\
F303,A40019,980E-5,980E,FortHills\n",
    )
    .unwrap();

    gtrack()
        .current_dir(tmp.path())
        .args(["units", "import"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 3 units"));

    let units = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["units", "list", "--model", "-4"]),
    );
    assert_eq!(units.as_array().unwrap().len(), 2);
}

// ============================================================================
// Scan / Log Tests
// ============================================================================

#[test]
fn test_scan_missing_drive_fails() {
    let tmp = setup_test_project();
    add_unit(&tmp);
    fs::remove_dir_all(tmp.path().join("drive")).unwrap();

    gtrack()
        .current_dir(tmp.path())
        .args(["scan", "--ftype", "fault"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("drive not found"));
}

#[test]
fn test_scan_unknown_unit_fails() {
    let tmp = setup_test_project();
    add_unit(&tmp);

    gtrack()
        .current_dir(tmp.path())
        .args(["scan", "--ftype", "plm", "--units", "F999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unit not found"));
}

#[test]
fn test_scan_rejects_bad_since() {
    let tmp = setup_test_project();

    gtrack()
        .current_dir(tmp.path())
        .args(["scan", "--ftype", "plm", "--since", "03/04/2021"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}

#[test]
fn test_log_empty() {
    let tmp = setup_test_project();

    gtrack()
        .current_dir(tmp.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No imports recorded"));
}
