//! Edge case tests for loading and writing tables

use crate::common::{column, TestFixture};
use std::fs;
use tablebridge::data::{write_table, DataProcessor, SourceOptions};
use tablebridge::validation::{ValidationMap, Validator};
use tablebridge::{Table, TablebridgeError, Value};

fn validation(pairs: &[(&str, Validator)]) -> ValidationMap {
    pairs.iter().map(|(c, v)| (c.to_string(), *v)).collect()
}

#[test]
fn test_csv_cells_load_as_text() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture.create_raw("sheet.csv", "id,size\n1,2.5\n2,\n").unwrap();

    let table = DataProcessor::new()
        .unwrap()
        .load_table(&path, &SourceOptions::default())
        .unwrap();

    assert_eq!(column(&table, "id"), vec![Value::from("1"), Value::from("2")]);
    assert!(column(&table, "size")[1].is_missing());
}

#[test]
fn test_point_and_uint64_validation() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw(
            "sheet.csv",
            "id,pt\n18446744073709551615,\"(12 40, 7)\"\n5,junk\n-3,\"1,2\"\n",
        )
        .unwrap();

    let options = SourceOptions {
        validation: validation(&[("id", Validator::Uint64), ("pt", Validator::Point)]),
        ..SourceOptions::default()
    };
    let table = DataProcessor::new().unwrap().load_table(&path, &options).unwrap();

    let ids = column(&table, "id");
    assert_eq!(ids[0], Value::from("18446744073709551615"));
    assert_eq!(ids[1], Value::Int(5));
    assert!(ids[2].is_missing());

    let points = column(&table, "pt");
    assert_eq!(points[0], Value::from(vec![12, 40, 7]));
    assert!(points[1].is_missing());
    assert!(points[2].is_missing());
}

#[test]
fn test_headerless_csv_with_names() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw("sheet.csv", "# exported sheet\n1,exc\n2,inh\n")
        .unwrap();

    let options = SourceOptions {
        columns: Some(vec!["cell_id".to_string(), "cell_type".to_string()]),
        header: false,
        skip_rows: 1,
        validation: validation(&[("cell_id", Validator::Int)]),
    };
    let table = DataProcessor::new().unwrap().load_table(&path, &options).unwrap();

    assert_eq!(table.column_names(), vec!["cell_id", "cell_type"]);
    assert_eq!(column(&table, "cell_id"), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_json_source_keeps_types() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw(
            "cells.json",
            r#"[{"id": 1, "size": 2.5, "kind": "exc"}, {"id": 2, "size": null, "kind": "inh"}]"#,
        )
        .unwrap();

    let options = SourceOptions {
        columns: Some(vec!["kind".to_string(), "id".to_string()]),
        ..SourceOptions::default()
    };
    let table = DataProcessor::new().unwrap().load_table(&path, &options).unwrap();

    assert_eq!(table.column_names(), vec!["kind", "id"]);
    assert_eq!(column(&table, "id"), vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn test_unsupported_and_missing_files() {
    let fixture = TestFixture::new().unwrap();
    let processor = DataProcessor::new().unwrap();

    let absent = processor.load_table(&fixture.root().join("absent.csv"), &SourceOptions::default());
    assert!(matches!(absent, Err(TablebridgeError::InvalidInput { .. })));

    let path = fixture.create_raw("notes.txt", "hello").unwrap();
    let unsupported = processor.load_table(&path, &SourceOptions::default());
    assert!(matches!(unsupported, Err(TablebridgeError::InvalidInput { .. })));
}

#[test]
fn test_write_escapes_fields() {
    let fixture = TestFixture::new().unwrap();
    let table = Table::from_rows(
        ["name", "pt"],
        vec![
            vec![Value::from("say \"hi\""), Value::from(vec![1, 2, 3])],
            vec![Value::Missing, Value::from("a\tb")],
        ],
    )
    .unwrap();

    let csv = fixture.root().join("out.csv");
    write_table(&table, &csv).unwrap();
    assert_eq!(
        fs::read_to_string(&csv).unwrap(),
        "name,pt\n\"say \"\"hi\"\"\",\"[1, 2, 3]\"\n,a\tb\n"
    );

    let tsv = fixture.root().join("out.tsv");
    write_table(&table, &tsv).unwrap();
    assert_eq!(
        fs::read_to_string(&tsv).unwrap(),
        "name\tpt\n\"say \"\"hi\"\"\"\t[1, 2, 3]\n\t\"a\tb\"\n"
    );
}

#[test]
fn test_csv_round_trip_through_loader() {
    let fixture = TestFixture::new().unwrap();
    let table = Table::from_rows(
        ["id", "pt"],
        vec![
            vec![Value::Int(1), Value::from(vec![4, 5, 6])],
            vec![Value::Int(2), Value::Missing],
        ],
    )
    .unwrap();
    let path = fixture.root().join("points.csv");
    write_table(&table, &path).unwrap();

    let options = SourceOptions {
        validation: validation(&[("id", Validator::Int), ("pt", Validator::Point)]),
        ..SourceOptions::default()
    };
    let loaded = DataProcessor::new().unwrap().load_table(&path, &options).unwrap();
    assert!(loaded.same_contents(&table));
}

#[test]
fn test_point_with_non_breaking_spaces() {
    let fixture = TestFixture::new().unwrap();
    let path = fixture
        .create_raw("sheet.csv", "id,pt\n1,10\u{a0}20\u{a0}30\n")
        .unwrap();

    let options = SourceOptions {
        validation: validation(&[("pt", Validator::Point)]),
        ..SourceOptions::default()
    };
    let table = DataProcessor::new().unwrap().load_table(&path, &options).unwrap();

    assert_eq!(column(&table, "pt"), vec![Value::from(vec![10, 20, 30])]);
}
