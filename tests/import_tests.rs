//! End-to-end import tests against a temp equipment drive

mod common;

use common::{
    add_unit, cycle_row, fault_csv, gtrack, haulcycle_csv, json, setup_test_project, stats_csv, unit_dls,
    write,
};
use predicates::prelude::*;
use std::fs;

const FAULT_ROWS: &[&str] = &[
    "1,#A123,x,1609459200|0,x,1609462800|0,x,3,Engine overspeed",
    "2,B77,x,1609459300|0,x,,x,1,Low oil",
];

#[test]
fn test_scan_lists_files_without_importing() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp);
    write(&dls.join("2021").join("fault0_301.csv"), &fault_csv(FAULT_ROWS));
    write(&dls.join("2021").join("notes.txt"), "ignored");

    gtrack()
        .current_dir(tmp.path())
        .args(["scan", "--ftype", "fault"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fault0_301.csv"))
        .stdout(predicate::str::contains("notes.txt").not());

    gtrack()
        .current_dir(tmp.path())
        .args(["scan", "--ftype", "fault", "--count"])
        .assert()
        .success()
        .stdout("1\n");

    gtrack()
        .current_dir(tmp.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No imports recorded"));
}

#[test]
fn test_process_faults_is_idempotent() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp);
    write(&dls.join("2021").join("fault0_301.csv"), &fault_csv(FAULT_ROWS));

    let first = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["process", "--ftype", "fault", "--units", "F301"]),
    );
    assert_eq!(first["files_found"], 1);
    assert_eq!(first["processed"], 1);
    assert_eq!(first["rows_added"], 2);

    let second = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["process", "--ftype", "fault", "--units", "F301"]),
    );
    assert_eq!(second["rows_added"], 0);

    let log = json(gtrack().current_dir(tmp.path()).arg("log"));
    let log = log.as_array().unwrap();
    assert_eq!(log.len(), 2);
    assert_eq!(log[0]["table"], "Faults");
}

#[test]
fn test_process_no_import_leaves_database_empty() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp);
    write(&dls.join("fault0_301.csv"), &fault_csv(FAULT_ROWS));

    gtrack()
        .current_dir(tmp.path())
        .args(["process", "--ftype", "fault", "--no-import"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows combined"));

    gtrack()
        .current_dir(tmp.path())
        .arg("log")
        .assert()
        .success()
        .stdout(predicate::str::contains("No imports recorded"));
}

#[test]
fn test_combine_plm_files() {
    let tmp = setup_test_project();
    add_unit(&tmp);

    let a = write(
        &tmp.path().join("in").join("F0301_haulcycle_a.csv"),
        &haulcycle_csv(&[
            cycle_row("01/05/21", "10:00:00", 290.5),
            cycle_row("01/05/21", "10:30:00", 300.0),
        ]),
    );
    let b = write(
        &tmp.path().join("in").join("F0301_haulcycle_b.csv"),
        &haulcycle_csv(&[
            cycle_row("01/05/21", "10:30:00", 310.0),
            cycle_row("01/06/21", "09:00:00", 280.0),
        ]),
    );

    let preview = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["combine", "--ftype", "plm", "--no-import"])
            .arg(&a)
            .arg(&b),
    );
    assert_eq!(preview["rows"], 3);
    assert!(preview["rows_added"].is_null());

    let since = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["combine", "--ftype", "plm", "--since", "2021-01-06"])
            .arg(&a)
            .arg(&b),
    );
    assert_eq!(since["rows_added"], 1);

    let all = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["combine", "--ftype", "plm"])
            .arg(&a)
            .arg(&b),
    );
    assert_eq!(all["rows_added"], 2);
}

#[test]
fn test_combine_reports_failed_files() {
    let tmp = setup_test_project();
    add_unit(&tmp);
    let good = write(&tmp.path().join("fault0_good.csv"), &fault_csv(FAULT_ROWS));
    let bad = write(&tmp.path().join("fault0_bad.csv"), "not a fault export");

    let report = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["combine", "--ftype", "fault"])
            .arg(&good)
            .arg(&bad),
    );
    assert_eq!(report["rows_added"], 2);
    assert_eq!(report["failed"].as_array().unwrap().len(), 1);
}

#[test]
fn test_combine_rejects_non_csv_type() {
    let tmp = setup_test_project();
    let f = write(&tmp.path().join("x_dsc_20210105"), "");

    gtrack()
        .current_dir(tmp.path())
        .args(["combine", "--ftype", "dsc"])
        .arg(&f)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no csv import"));
}

#[test]
fn test_process_dsc_moves_into_download_layout() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp);
    let dsc = dls.join("GE dump").join("F301_dsc_20210105-101500");
    write(&dsc.join("stats.txt"), "drive data");

    gtrack()
        .current_dir(tmp.path())
        .args(["process", "--ftype", "dsc"])
        .assert()
        .success();

    let dst = unit_dls(&tmp).join("2021").join("F301 - 2021-01-05 - DLS");
    assert!(dst.join("F301_dsc_20210105-101500.zip").exists());
    assert!(!dsc.exists());
}

#[test]
fn test_downtime_import_and_exclusions() {
    let tmp = setup_test_project();
    add_unit(&tmp);

    let downtime = write(
        &tmp.path().join("downtime.csv"),
        "Equipment Downtime\nGenerated 2021-01-06\n\
EqmtModel,FieldId,FullShiftName,Moment,Duration,Reason,FieldComment,Origin\n\
Komatsu 980E-OS,F0301,05-Jan-2021 Day,07:00:00,01:30:00,Engine,Low power,Staffed\n\
Komatsu 980E-OS,F0301,05-Jan-2021 Night,02:00:00,00:30:00,Tires,,Staffed\n\
CAT 797F,F0401,05-Jan-2021 Day,07:00:00,01:30:00,Engine,,Staffed\n",
    );

    let report = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["downtime", "import"])
            .arg(&downtime),
    );
    assert_eq!(report["rows_added"], 2);
    assert_eq!(report["table"], "Downtime");

    gtrack()
        .current_dir(tmp.path())
        .args([
            "downtime",
            "exclusions",
            "create",
            "--dates",
            "2021-01-05,2021-01-06",
            "--units",
            "F301",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created 2 exclusions"));

    gtrack()
        .current_dir(tmp.path())
        .args([
            "downtime",
            "exclusions",
            "set-ma",
            "--range",
            "F301-F305",
            "--from",
            "2021-01-01",
            "--to",
            "2021-01-05",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("on 1 exclusions"));

    let exclusions = write(
        &tmp.path().join("exclusions.csv"),
        "EqmtUnit,TC08,Duration,DateEmail\nF0301,20,24,2021-01-07\n",
    );
    let report = json(
        gtrack()
            .current_dir(tmp.path())
            .args(["downtime", "exclusions", "import"])
            .arg(&exclusions),
    );
    assert_eq!(report["rows_added"], 1);
}

#[test]
fn test_set_ma_requires_dates() {
    let tmp = setup_test_project();
    add_unit(&tmp);

    gtrack()
        .current_dir(tmp.path())
        .args(["downtime", "exclusions", "set-ma", "--units", "F301"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--dates"));
}

#[test]
fn test_dls_recent() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp);
    fs::create_dir_all(dls.join("2020").join("F301 - 2020-12-01 - DLS")).unwrap();
    fs::create_dir_all(dls.join("2021").join("F301 - 2021-01-05 - DLS")).unwrap();
    fs::create_dir_all(dls.join("2021").join("F301 - 2021-02-10 - DLS")).unwrap();

    gtrack()
        .current_dir(tmp.path())
        .args(["dls", "recent", "F301"])
        .assert()
        .success()
        .stdout(predicate::str::contains("F301 - 2021-02-10 - DLS"));
}

#[test]
fn test_dls_import_uploads_folder() {
    let tmp = setup_test_project();
    add_unit(&tmp);

    let src = tmp.path().join("local").join("F301 - 2021-03-04");
    write(&src.join("VHMS").join("fault0_301.csv"), &fault_csv(FAULT_ROWS));

    let result = json(gtrack().current_dir(tmp.path()).args(["dls", "import"]).arg(&src));
    assert_eq!(result["name"], "F301 - 2021-03-04");
    assert_eq!(result["fault"]["num"], 2);

    let dst = unit_dls(&tmp).join("2021").join("F301 - 2021-03-04 - DLS");
    assert!(dst.join("VHMS").join("fault0_301.csv").exists());
    assert!(!src.exists());
}

#[test]
fn test_dls_dsc_lists_newest_per_unit() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp).join("2021");
    let older = dls.join("F301 - 2021-01-15 - DLS").join("328_dsc_20210115-072028");
    let newer = dls.join("F301 - 2021-03-04 - DLS").join("328_dsc_20210304-072028");
    write(&older.join("stats").join("SERIAL_328.csv"), &stats_csv(12345.6));
    write(&newer.join("a.csv"), "x");

    let rows = json(gtrack().current_dir(tmp.path()).args(["dls", "dsc", "--units", "F301"]));
    let rows = rows.as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["unit"], "F301");
    assert_eq!(rows[0]["date"], "2021-03-04");

    let rows = json(gtrack().current_dir(tmp.path()).args(["dls", "dsc", "--all"]));
    assert_eq!(rows.as_array().unwrap().len(), 2);

    gtrack()
        .current_dir(tmp.path())
        .args(["dls", "dsc", "--zip"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Zipped"));
    assert!(dls.join("F301 - 2021-03-04 - DLS.zip").is_file());
    assert!(newer.is_dir());
}

#[test]
fn test_dls_stats_from_exports_and_files() {
    let tmp = setup_test_project();
    let dls = add_unit(&tmp).join("2021");
    let p_dsc = dls.join("F301 - 2021-01-15 - DLS").join("328_dsc_20210115-072028");
    let p_csv = write(&p_dsc.join("stats").join("SERIAL_328.csv"), &stats_csv(12345.6));

    let stats = json(gtrack().current_dir(tmp.path()).args(["dls", "stats"]));
    let stats = stats.as_array().unwrap();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0]["unit"], "F301");
    assert_eq!(stats[0]["engine_hrs"], 12345.6);
    assert_eq!(stats[0]["values"]["truck_sn"], "A40017");
    assert_eq!(stats[0]["values"]["psc_ver"], "21.3");

    let later = write(&tmp.path().join("SERIAL_later.csv"), &stats_csv(12400.0));
    let stats = json(gtrack().current_dir(tmp.path()).args(["dls", "stats"]).arg(&p_csv).arg(&later));
    let hrs: Vec<f64> = stats
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["engine_hrs"].as_f64().unwrap())
        .collect();
    assert_eq!(hrs, vec![12345.6, 12400.0]);
}
