use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_cli_run_arithmetic() {
    let mut cmd = Command::cargo_bin("dimcalc").unwrap();
    cmd.arg("run").arg("5 enter 3 +");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Register"))
        .stdout(predicate::str::contains("8"));
}

#[test]
fn test_cli_run_unit_conversion_json() {
    let mut cmd = Command::cargo_bin("dimcalc").unwrap();
    cmd.arg("run").arg("2 [km] [m]").arg("--json");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"registers\""))
        .stdout(predicate::str::contains("2000"));
}

#[test]
fn test_cli_run_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let script = temp_dir.path().join("area.keys");
    fs::write(
        &script,
        "# width times height\n3 [m] enter\n4 [m] *\n",
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("dimcalc").unwrap();
    cmd.arg("run").arg("--file").arg(&script);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("12"))
        .stdout(predicate::str::contains("m^2"));
}

#[test]
fn test_cli_parse_error_points_at_key() {
    let mut cmd = Command::cargo_bin("dimcalc").unwrap();
    cmd.arg("run").arg("1 enter bogus");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_cli_calculation_error_fails() {
    let mut cmd = Command::cargo_bin("dimcalc").unwrap();
    cmd.arg("run").arg("1 enter 0 /");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("division by zero"));
}

#[test]
fn test_cli_snapshot_round_trip() {
    let temp_dir = TempDir::new().unwrap();
    let snapshot = temp_dir.path().join("state.json");

    Command::cargo_bin("dimcalc")
        .unwrap()
        .arg("run")
        .arg("3 sto(a)")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--save")
        .assert()
        .success();
    assert!(snapshot.exists());

    Command::cargo_bin("dimcalc")
        .unwrap()
        .arg("run")
        .arg("rcl(a) enter 2 *")
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--json")
        .assert()
        .success()
        .stdout(predicate::str::contains("6.0"));
}

#[test]
fn test_cli_units_filter() {
    let mut cmd = Command::cargo_bin("dimcalc").unwrap();
    cmd.arg("units").arg("km");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("km"))
        .stdout(predicate::str::contains("1000"));
}
