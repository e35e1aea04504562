//! Functional tests for the diff command

use crate::common::{assertions, sample_data, CliTestRunner};
use std::fs;
use tablebridge::TablebridgeError;

fn runner_with_versions() -> CliTestRunner {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_csv("old.csv", &sample_data::annotation_csv_data())
        .unwrap();
    fixture
        .create_csv("new.csv", &sample_data::updated_annotation_csv_data())
        .unwrap();
    runner
}

fn path(runner: &CliTestRunner, name: &str) -> String {
    runner.fixture().root().join(name).to_string_lossy().to_string()
}

#[test]
fn test_diff_writes_partitions() {
    let runner = runner_with_versions();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");
    let out = path(&runner, "out");

    runner.expect_success(&["diff", &new, &old, "--id", "cell_id", "--output-dir", &out]);

    let out_dir = runner.fixture().root().join("out");
    for name in ["new.csv", "removed.csv", "changed.csv", "unchanged.csv", "summary.json"] {
        assertions::assert_file_exists_and_not_empty(&out_dir.join(name));
    }

    let new_rows = fs::read_to_string(out_dir.join("new.csv")).unwrap();
    assert!(new_rows.starts_with("cell_id,cell_type,soma_size,position\n"));
    assert!(new_rows.contains("105,inh,7.5"));
    assert_eq!(new_rows.lines().count(), 2);

    let removed = fs::read_to_string(out_dir.join("removed.csv")).unwrap();
    assert!(removed.contains("103,exc,14.5"));

    let changed = fs::read_to_string(out_dir.join("changed.csv")).unwrap();
    assert!(changed.contains("102,exc,8.0"));
    assert_eq!(changed.lines().count(), 2);

    let unchanged = fs::read_to_string(out_dir.join("unchanged.csv")).unwrap();
    let ids: Vec<&str> = unchanged
        .lines()
        .skip(1)
        .filter_map(|line| line.split(',').next())
        .collect();
    assert_eq!(ids, vec!["101", "104"]);

    let summary: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(out_dir.join("summary.json")).unwrap()).unwrap();
    assert_eq!(summary["new"], 1);
    assert_eq!(summary["removed"], 1);
    assert_eq!(summary["changed"], 1);
    assert_eq!(summary["unchanged"], 2);
    assert_eq!(summary["id_column"], "cell_id");
}

#[test]
fn test_diff_json_format() {
    let runner = runner_with_versions();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");

    runner.expect_success(&["diff", &new, &old, "--id", "cell_id", "--format", "json"]);
}

#[test]
fn test_diff_with_point_validation() {
    let runner = runner_with_versions();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");
    let out = path(&runner, "out");

    runner.expect_success(&[
        "diff",
        &new,
        &old,
        "--id",
        "cell_id",
        "--validate",
        "cell_id=int",
        "--validate",
        "position=point",
        "--output-dir",
        &out,
    ]);

    let new_rows = fs::read_to_string(runner.fixture().root().join("out/new.csv")).unwrap();
    assert!(new_rows.contains("\"[13, 23, 33]\""));
}

#[test]
fn test_diff_identity_from_config() {
    let runner = runner_with_versions();
    runner
        .fixture()
        .write_config(&serde_json::json!({"id_column": "cell_id"}))
        .unwrap();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");

    runner.expect_success(&["diff", &new, &old, "--format", "json"]);
}

#[test]
fn test_diff_without_identity_fails() {
    let runner = runner_with_versions();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");

    let err = runner.expect_failure(&["diff", &new, &old]);
    assert!(matches!(err, TablebridgeError::Configuration { .. }));
}

#[test]
fn test_diff_with_schema() {
    let runner = runner_with_versions();
    let fixture = runner.fixture();
    fixture
        .create_raw(
            "schema.json",
            r#"{
                "id": "cell_id",
                "class": {
                    "rule": "rename",
                    "source": "cell_type",
                    "remap": {"exc": "excitatory", "inh": "inhibitory"},
                    "unmapped": "missing"
                }
            }"#,
        )
        .unwrap();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");
    let schema = path(&runner, "schema.json");
    let out = path(&runner, "out");

    runner.expect_success(&[
        "diff", &new, &old, "--id", "id", "--schema", &schema, "--output-dir", &out,
    ]);

    let changed = fs::read_to_string(fixture.root().join("out/changed.csv")).unwrap();
    assert_eq!(changed, "id,class\n102,excitatory\n");
}

#[test]
fn test_diff_duplicate_identity() {
    let runner = CliTestRunner::new().unwrap();
    let fixture = runner.fixture();
    fixture
        .create_csv("old.csv", &sample_data::annotation_csv_data())
        .unwrap();
    fixture
        .create_raw(
            "new.csv",
            "cell_id,cell_type,soma_size,position\n101,exc,1.0,\n101,inh,2.0,\n",
        )
        .unwrap();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");

    let err = runner.expect_failure(&["diff", &new, &old, "--id", "cell_id"]);
    match err {
        TablebridgeError::DuplicateIdentity { column, value } => {
            assert_eq!(column, "cell_id");
            assert_eq!(value, "101");
        }
        other => panic!("expected duplicate identity, got {}", other),
    }
}

#[test]
fn test_diff_missing_file() {
    let runner = runner_with_versions();
    let old = path(&runner, "old.csv");
    let absent = path(&runner, "absent.csv");

    let err = runner.expect_failure(&["diff", &absent, &old, "--id", "cell_id"]);
    assert!(matches!(err, TablebridgeError::InvalidInput { .. }));
}

#[test]
fn test_diff_invalid_format() {
    let runner = runner_with_versions();
    let new = path(&runner, "new.csv");
    let old = path(&runner, "old.csv");

    let err = runner.expect_failure(&["diff", &new, &old, "--id", "cell_id", "--format", "xml"]);
    assert!(err.to_string().contains("xml"));
}
