use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn write_dataset(dir: &Path) {
    fs::write(
        dir.join("vehicle_data.csv"),
        concat!(
            "TRO;1;a;b;GER01PLANT;ITA01DEAL;01/01/2025-10:00:00;x;05/01/2025-00:00:00\n",
            "TRO;2;a;b;GER01PLANT;ITA01DEAL;01/01/2025-10:00:00;x;06/01/2025-00:00:00\n",
        ),
    )
    .unwrap();
    let truck_rows = concat!(
        "PLT;x;y;GER01PLANTITA01DEAL-TRUCK-1;02/01/2025-08:00:00;04/01/2025-18:00:00;2.0;0.0\n",
        "PLT;x;y;GER01PLANTITA01DEAL-TRUCK-2;03/01/2025-08:00:00;05/01/2025-18:00:00;2.0;100.0\n",
    );
    fs::write(dir.join("planned_capacity_data.csv"), truck_rows).unwrap();
    fs::write(dir.join("realised_capacity_data_001.csv"), truck_rows).unwrap();
    fs::write(
        dir.join("capacity_history.csv"),
        concat!(
            "#PathSegment;h;h;h;h\n",
            "GER01PLANTITA01DEAL-TRUCK-1;x;04/12/2024-08:00:00;2.0;0.0\n",
            "GER01PLANTITA01DEAL-TRUCK-1;x;11/12/2024-08:00:00;1.0;0.0\n",
        ),
    )
    .unwrap();
}

#[test]
fn plan_deterministic_writes_artifact_and_manifest() {
    let dataset = tempfile::tempdir().unwrap();
    write_dataset(dataset.path());
    let out = tempfile::tempdir().unwrap();

    let mut cmd = Command::cargo_bin("vlt-cli").unwrap();
    cmd.args([
        "plan",
        "--dataset",
        dataset.path().to_str().unwrap(),
        "--out",
        out.path().to_str().unwrap(),
        "--deterministic",
    ])
    .assert()
    .success();

    assert!(out.path().join("001").join("solution.json").exists());
    assert!(out.path().join("batch_manifest.json").exists());
}

#[test]
fn plan_realtime_then_verify_and_evaluate() {
    let dataset = tempfile::tempdir().unwrap();
    write_dataset(dataset.path());
    let out = tempfile::tempdir().unwrap();

    Command::cargo_bin("vlt-cli")
        .unwrap()
        .args([
            "plan",
            "--dataset",
            dataset.path().to_str().unwrap(),
            "--out",
            out.path().to_str().unwrap(),
        ])
        .assert()
        .success();

    let artifact = out.path().join("001").join("solution.json");
    Command::cargo_bin("vlt-cli")
        .unwrap()
        .args([
            "verify",
            "--artifact",
            artifact.to_str().unwrap(),
            "--dataset",
            dataset.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 errors"));

    Command::cargo_bin("vlt-cli")
        .unwrap()
        .args([
            "evaluate",
            "--artifact",
            artifact.to_str().unwrap(),
            "--dataset",
            dataset.path().to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("objective:"));
}

#[test]
fn plan_with_quantile_derating() {
    let dataset = tempfile::tempdir().unwrap();
    write_dataset(dataset.path());
    let out = tempfile::tempdir().unwrap();

    Command::cargo_bin("vlt-cli")
        .unwrap()
        .args([
            "plan",
            "--dataset",
            dataset.path().to_str().unwrap(),
            "--out",
            out.path().to_str().unwrap(),
            "--quantile",
            "1.0",
        ])
        .assert()
        .success();
    assert!(out.path().join("001").join("solution.json").exists());
}

#[test]
fn plan_rejects_conflicting_derate_flags() {
    let dataset = tempfile::tempdir().unwrap();
    write_dataset(dataset.path());
    let out = tempfile::tempdir().unwrap();

    Command::cargo_bin("vlt-cli")
        .unwrap()
        .args([
            "plan",
            "--dataset",
            dataset.path().to_str().unwrap(),
            "--out",
            out.path().to_str().unwrap(),
            "--quantile",
            "0.5",
            "--stddev-factor",
            "1.0",
        ])
        .assert()
        .failure();
}

#[test]
fn plan_fails_on_missing_dataset() {
    let out = tempfile::tempdir().unwrap();
    Command::cargo_bin("vlt-cli")
        .unwrap()
        .args([
            "plan",
            "--dataset",
            "/nonexistent/dataset",
            "--out",
            out.path().to_str().unwrap(),
        ])
        .assert()
        .failure();
}
