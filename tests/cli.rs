mod common;

use assert_cmd::Command;
use common::{write_linked_netcdf, write_named_netcdf};
use predicates::prelude::*;
use tempfile::TempDir;

fn fixture() -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stations.nc");
    write_linked_netcdf(&path);
    (dir, path)
}

#[test]
fn tables_prints_the_forest() {
    let (_dir, path) = fixture();
    Command::cargo_bin("pointnest")
        .unwrap()
        .args(["--preset", "linked"])
        .arg(&path)
        .arg("tables")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("station (2 rows)"))
        .stdout(predicate::str::contains("└── record (6 rows) via forward-linked"));
}

#[test]
fn features_lists_stations() {
    let (_dir, path) = fixture();
    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .args(["features", "--preset", "linked"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[0] record station depth=2"))
        .stdout(predicate::str::contains("id=station_id@station"));
}

#[test]
fn inline_convention_matches_the_preset() {
    let (_dir, path) = fixture();
    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .args(["features", "--first-child", "firstChild", "--next-child", "nextChild"])
        .assert()
        .success()
        .stdout(predicate::str::contains("station depth=2"));
}

#[test]
fn conventions_file_is_loaded() {
    let (dir, path) = fixture();
    let config = dir.path().join("conventions.toml");
    std::fs::write(
        &config,
        concat!(
            "[[convention]]\n",
            "firstChild = \"firstChild\"\n",
            "nextChild = \"nextChild\"\n",
            "stationDim = \"station\"\n",
            "obsDim = \"record\"\n",
        ),
    )
    .unwrap();

    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .arg("tables")
        .arg("--conventions")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("via forward-linked"));
}

#[test]
fn dump_prints_rows() {
    let (_dir, path) = fixture();
    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .args(["dump", "--limit", "4", "--preset", "linked"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("id\ttime\tlat\tlon\theight\n"))
        .stdout(predicate::str::contains("725\t60\t40\t-105\t-"))
        .stdout(predicate::str::contains("726\t0\t41\t-104\t-"))
        .stdout(predicate::str::contains("726\t30").not());
}

#[test]
fn without_conventions_there_are_no_station_features() {
    let (_dir, path) = fixture();
    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .arg("features")
        .assert()
        .success()
        .stdout(predicate::str::contains("station depth").not());
}

#[test]
fn missing_feature_fails() {
    let (_dir, path) = fixture();
    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .args(["dump", "--feature", "3", "--preset", "linked"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No feature 3"));
}

#[test]
fn missing_file_fails() {
    Command::cargo_bin("pointnest")
        .unwrap()
        .args(["/nonexistent/stations.nc", "tables"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Path not found"));
}

#[test]
fn named_stations_show_metadata_and_missing_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("named.nc");
    write_named_netcdf(&path);

    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .args(["features", "--preset", "linked", "--station-alt", "stn_elev"])
        .assert()
        .success()
        .stdout(predicate::str::contains("id=station_name@station"))
        .stdout(predicate::str::contains("desc=station_description@station"))
        .stdout(predicate::str::contains("wmo=wmo_id@station"))
        .stdout(predicate::str::contains(
            "time_units=\"seconds since 1970-01-01\"",
        ));

    Command::cargo_bin("pointnest")
        .unwrap()
        .arg(&path)
        .args(["dump", "--preset", "linked", "--limit", "6"])
        .assert()
        .success()
        .stdout(predicate::str::contains("KDEN\t60\t40\t-105\t-\n"))
        .stdout(predicate::str::contains("KBO\t-\t41\t-104\t-\n"));
}
