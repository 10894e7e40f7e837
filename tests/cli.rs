//! Binary-level probe/process flows over temporary files.

mod common;

use std::fs;

use assert_cmd::Command;
use csv_impute::schema::{ColumnType, ItemKind, Schema};
use predicates::str::contains;

use common::TestWorkspace;

fn sample_csv() -> &'static str {
    "age,score,label\n25,1|2|3,alpha\n,4||6,beta\n35,7|8|9,gamma\n"
}

#[test]
fn probe_infers_vector_columns_into_metadata() {
    let workspace = TestWorkspace::new();
    let csv_path = workspace.write("sample.csv", sample_csv());
    let meta_path = workspace.path().join("sample.meta");

    Command::cargo_bin("csv-impute")
        .expect("binary exists")
        .args([
            "probe",
            "-i",
            csv_path.to_str().unwrap(),
            "-m",
            meta_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let schema = Schema::load(&meta_path).expect("load meta");
    assert_eq!(schema.columns.len(), 3);
    assert_eq!(
        schema.columns[0].datatype,
        ColumnType::Scalar(ItemKind::Integer)
    );
    assert_eq!(
        schema.columns[1].datatype,
        ColumnType::Vector(ItemKind::Integer)
    );
    assert_eq!(schema.columns[2].datatype, ColumnType::Scalar(ItemKind::Text));
}

#[test]
fn process_applies_a_handling_directive() {
    let workspace = TestWorkspace::new();
    let csv_path = workspace.write("sample.csv", sample_csv());
    let output_path = workspace.path().join("out.csv");

    Command::cargo_bin("csv-impute")
        .expect("binary exists")
        .args([
            "process",
            "-i",
            csv_path.to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
            "--handle",
            "age:mean:indicator",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&output_path).expect("read output");
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("\"age\",\"score\",\"label\""));
    // Missing age becomes the mean (30) with the indicator slot set.
    assert_eq!(lines.next(), Some("\"25|0\",\"1|2|3\",\"alpha\""));
    assert_eq!(lines.next(), Some("\"30|1\",\"4||6\",\"beta\""));
    assert_eq!(lines.next(), Some("\"35|0\",\"7|8|9\",\"gamma\""));
}

#[test]
fn process_reads_requests_from_a_spec_file() {
    let workspace = TestWorkspace::new();
    let csv_path = workspace.write("sample.csv", sample_csv());
    let spec_path = workspace.write(
        "handling.yaml",
        "defaults:\n  kind: minimum\n  concat_indicator: false\ncolumns:\n  - source: score\n    dest: score\n    impute_by_slot: true\n",
    );
    let output_path = workspace.path().join("out.csv");

    Command::cargo_bin("csv-impute")
        .expect("binary exists")
        .args([
            "process",
            "-i",
            csv_path.to_str().unwrap(),
            "-o",
            output_path.to_str().unwrap(),
            "--spec",
            spec_path.to_str().unwrap(),
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(&output_path).expect("read output");
    // The middle slot of row two takes the per-slot minimum (2).
    assert!(contents.contains("\"4|2|6\""));
}

#[test]
fn process_rejects_an_unknown_column() {
    let workspace = TestWorkspace::new();
    let csv_path = workspace.write("sample.csv", sample_csv());

    Command::cargo_bin("csv-impute")
        .expect("binary exists")
        .args([
            "process",
            "-i",
            csv_path.to_str().unwrap(),
            "--handle",
            "absent:mean",
        ])
        .assert()
        .failure()
        .stderr(contains("does not exist in the input schema"));
}
