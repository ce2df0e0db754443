//! Shared test helpers for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo;
use assert_cmd::Command;
use tempfile::TempDir;

/// Equipment folder for FortHills 980E trucks, relative to the drive
pub const TRUCKS: &str = "Fort Hills/980E Trucks";

/// Helper to get a gtrack command isolated from the caller's environment
pub fn gtrack() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("gtrack"));
    cmd.env_remove("GTRACK_CONFIG")
        .env_remove("GTRACK_DB")
        .env_remove("RUST_LOG");
    cmd
}

/// Temp project with a config pointing at a drive folder inside it
pub fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    fs::create_dir_all(root.join("drive").join(TRUCKS)).unwrap();

    let config = format!(
        "drive: {drive}\n\
database: {db}\n\
unit_paths:\n  FortHills:\n    \"980E\": {trucks}\n\
search_folders:\n  - downloads\n\
tr3_export: {tr3}\n\
lookback_days: 31\n",
        drive = root.join("drive").display(),
        db = root.join("gt.db").display(),
        trucks = TRUCKS,
        tr3 = root.join("tr3 export").display(),
    );
    fs::write(root.join("guesttracker.yaml"), config).unwrap();
    tmp
}

/// Register F301 (serial A40017) and create its Downloads folder
pub fn add_unit(tmp: &TempDir) -> PathBuf {
    gtrack()
        .current_dir(tmp.path())
        .args([
            "units",
            "add",
            "F301",
            "--serial",
            "A40017",
            "--model",
            "980E-4",
            "--minesite",
            "FortHills",
        ])
        .assert()
        .success();

    let p_dls = unit_dls(tmp);
    fs::create_dir_all(&p_dls).unwrap();
    p_dls
}

pub fn unit_dls(tmp: &TempDir) -> PathBuf {
    tmp.path()
        .join("drive")
        .join(TRUCKS)
        .join("F301 - A40017")
        .join("Downloads")
}

/// VHMS fault export for serial A40017 with the given data rows
pub fn fault_csv(rows: &[&str]) -> String {
    let mut lines = vec![
        "Fault History".to_string(),
        "Machine Model,980E".to_string(),
        "Machine Type Minor Variation Code,-4".to_string(),
        "Machine Serial No.,A40017".to_string(),
        "Product Name,VHMS".to_string(),
    ];
    lines.resize(28, String::new());
    lines.extend(rows.iter().map(|r| r.to_string()));
    lines.join("\n")
}

/// PLM haul cycle export for customer unit F0301
pub fn haulcycle_csv(rows: &[String]) -> String {
    let mut lines = vec![
        "Cust Unit: F0301".to_string(),
        "Frame SN: A40017".to_string(),
        "Truck Type: 980E".to_string(),
        "Software: 1.2".to_string(),
        "Site: Fort Hills".to_string(),
        "Report: Haul Cycle".to_string(),
        String::new(),
        String::new(),
        "Date,Time,Payload(Net),Swingloads,Status Flag,Carry Back,TotalCycle Time,\
L-Haul Distance,L-Max Speed,E MaxSpeed,Max Sprung,Truck Type,Tare Sprung Weight,\
Payload Est.@Shovel(Net),Quick Payload Estimate(Net),Gross Payload"
            .to_string(),
    ];
    lines.extend(rows.iter().cloned());
    lines.push("CHECKSUM,1".to_string());
    lines.push("CHECKSUM,2".to_string());
    lines.join("\n")
}

pub fn cycle_row(date: &str, time: &str, payload: f64) -> String {
    format!(
        "{},{},{},4,A,1 2.5,00:10:30,3.4,55,60,120,980E,180,{},{},{}",
        date, time, payload, payload, payload, payload
    )
}

/// GE dsc stats csv for serial A40017
pub fn stats_csv(engine_hrs: f64) -> String {
    format!(
        ",Name,Value\n\
0,Truck Identification,TEMP\n\
1,Truck Serial Number,A40017\n\
2,Truck Model,980E-4\n\
3,Todays Date/Time,01/15/2021 07:20:28\n\
4,Total Hours,{}\n\
5,PSC Code Version,21.3\n",
        engine_hrs
    )
}

pub fn write(p: &Path, content: &str) -> PathBuf {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(p, content).unwrap();
    p.to_path_buf()
}

/// Parse stdout of a `--format json` run
pub fn json(cmd: &mut Command) -> serde_json::Value {
    let output = cmd.arg("--format").arg("json").output().unwrap();
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}
