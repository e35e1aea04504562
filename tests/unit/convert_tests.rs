//! Unit tests for schema-driven conversion

use crate::common::{assertions, column};
use std::sync::{Arc, Mutex};
use tablebridge::convert::{Aggregation, ColumnRule, Remap, RuleKind};
use tablebridge::generators::{counter, GeneratorSpec};
use tablebridge::{convert, ConversionSchema, Table, TablebridgeError, UnmappedPolicy, Value, ValueType};

fn annotations() -> Table {
    Table::from_rows(
        ["cell_id", "cell_type", "soma_size", "x", "y", "z"],
        vec![
            vec![Value::Int(101), Value::from("exc"), Value::Float(12.0), Value::Int(1), Value::Int(2), Value::Int(3)],
            vec![Value::Int(102), Value::from("inh"), Value::Float(8.0), Value::Int(4), Value::Int(5), Value::Int(6)],
            vec![Value::Int(103), Value::from("exc"), Value::Float(14.0), Value::Int(7), Value::Int(8), Value::Int(9)],
            vec![Value::Int(104), Value::from("glia"), Value::Missing, Value::Int(0), Value::Int(0), Value::Int(0)],
        ],
    )
    .unwrap()
}

#[test]
fn test_rename_only_schema_is_idempotent() {
    let schema = ConversionSchema::new()
        .rename("id", "cell_id")
        .rename("type", "cell_type");
    let converted = convert(&annotations(), &schema).unwrap();

    let identity = ConversionSchema::identity_for(&converted);
    assert_eq!(identity.output_columns().collect::<Vec<_>>(), vec!["id", "type"]);
    assertions::assert_same_table(&convert(&converted, &identity).unwrap(), &converted);
}

#[test]
fn test_only_schema_columns_are_kept() {
    let schema = ConversionSchema::new().rename("size", "soma_size").rename("id", "cell_id");
    let converted = schema.convert(&annotations()).unwrap();

    assert_eq!(converted.column_names(), vec!["size", "id"]);
    assert_eq!(converted.len(), 4);
}

#[test]
fn test_strict_remap_drops_unmapped_values() {
    let remap = Remap::new(UnmappedPolicy::Missing)
        .map("exc", "excitatory")
        .map("inh", "inhibitory");
    let schema = ConversionSchema::new().with_column("class", ColumnRule::remap("cell_type", remap));
    let converted = schema.convert(&annotations()).unwrap();

    let classes = column(&converted, "class");
    assert_eq!(classes[0], Value::from("excitatory"));
    assert_eq!(classes[1], Value::from("inhibitory"));
    assert!(classes[3].is_missing());
}

#[test]
fn test_lenient_remap_passes_unmapped_values() {
    let remap = Remap::new(UnmappedPolicy::PassThrough).map("exc", "excitatory");
    let schema = ConversionSchema::new().with_column("class", ColumnRule::remap("cell_type", remap));
    let converted = schema.convert(&annotations()).unwrap();

    assert_eq!(column(&converted, "class")[3], Value::from("glia"));
}

#[test]
fn test_failing_remap_reports_value() {
    let remap = Remap::new(UnmappedPolicy::Error).map("exc", "excitatory").map("inh", "inhibitory");
    let schema = ConversionSchema::new().with_column("class", ColumnRule::remap("cell_type", remap));

    match schema.convert(&annotations()) {
        Err(TablebridgeError::MissingValue { column, value }) => {
            assert_eq!(column, "cell_type");
            assert_eq!(value, "glia");
        }
        other => panic!("expected missing value error, got {:?}", other.map(|t| t.len())),
    }
}

#[test]
fn test_apply_builds_points_from_columns() {
    let schema = ConversionSchema::new().rename("id", "cell_id").apply("position", |row| {
        Value::List(vec![
            row.value("x").clone(),
            row.value("y").clone(),
            row.value("z").clone(),
        ])
    });
    let converted = schema.convert(&annotations()).unwrap();

    assert_eq!(column(&converted, "position")[1], Value::from(vec![4, 5, 6]));
}

#[test]
fn test_generator_rules() {
    let schema = ConversionSchema::new()
        .rename("id", "cell_id")
        .with_column(
            "uid",
            GeneratorSpec::Counter {
                start: 10,
                step: 5,
                prefix: Some("ID-".to_string()),
            },
        )
        .with_column("source", GeneratorSpec::Constant { value: Value::from("sheet") })
        .with_column("note", GeneratorSpec::Missing);
    let converted = schema.convert(&annotations()).unwrap();

    assert_eq!(
        column(&converted, "uid")[..3],
        [Value::from("ID-10"), Value::from("ID-15"), Value::from("ID-20")]
    );
    assert!(column(&converted, "source").iter().all(|v| v == &Value::from("sheet")));
    assert!(column(&converted, "note").iter().all(Value::is_missing));
}

#[test]
fn test_shared_generator_continues_across_runs() {
    let shared = Arc::new(Mutex::new(counter(1)));
    let schema = ConversionSchema::new().with_column("uid", ColumnRule::shared(shared));

    let first = schema.convert(&annotations()).unwrap();
    let second = schema.convert(&annotations()).unwrap();
    assert_eq!(column(&first, "uid")[0], Value::Int(1));
    assert_eq!(column(&second, "uid")[0], Value::Int(5));
}

#[test]
fn test_transform_broadcasts_group_aggregate() {
    let schema = ConversionSchema::new()
        .rename("type", "cell_type")
        .with_column("mean_size", ColumnRule::transform("cell_type", "soma_size", Aggregation::Mean))
        .with_column("max_size", ColumnRule::transform("cell_type", "soma_size", Aggregation::Max))
        .with_column("n", ColumnRule::transform("cell_type", "soma_size", Aggregation::Count));
    let converted = schema.convert(&annotations()).unwrap();

    let means = column(&converted, "mean_size");
    assert_eq!(means[0], Value::Float(13.0));
    assert_eq!(means[2], Value::Float(13.0));
    assert_eq!(means[1], Value::Float(8.0));
    // glia has only a missing size
    assert!(means[3].is_missing());

    assert_eq!(column(&converted, "max_size")[0], Value::Float(14.0));
    assert_eq!(column(&converted, "n")[3], Value::Int(0));
}

#[test]
fn test_fill_missing_and_dtype() {
    let schema = ConversionSchema::new()
        .with_column(
            "size",
            ColumnRule::rename("soma_size").with_fill_missing(0).with_dtype(ValueType::Int),
        )
        .with_column("label", ColumnRule::rename("cell_id").with_dtype(ValueType::Text));
    let converted = schema.convert(&annotations()).unwrap();

    assert_eq!(
        column(&converted, "size"),
        vec![Value::Int(12), Value::Int(8), Value::Int(14), Value::Int(0)]
    );
    assert_eq!(column(&converted, "label")[0], Value::from("101"));
}

#[test]
fn test_rules_are_validated_before_conversion() {
    let schema = ConversionSchema::new()
        .rename("id", "cell_id")
        .with_column("m", ColumnRule::transform("region", "soma_size", Aggregation::Mean));
    let err = schema.convert(&annotations()).unwrap_err();
    assert!(matches!(err, TablebridgeError::Schema { ref message } if message.contains("region")));
    assert!(schema.validate(&annotations()).is_err());
}

#[test]
fn test_string_shorthand_is_rename() {
    let schema = ConversionSchema::new().with_column("id", "cell_id");
    assert!(matches!(
        schema.get("id").map(|rule| &rule.kind),
        Some(RuleKind::Rename(rename)) if rename.source == "cell_id"
    ));
}

#[test]
fn test_input_is_not_modified() {
    let table = annotations();
    let before = table.clone();
    ConversionSchema::new()
        .with_column("size", ColumnRule::rename("soma_size").with_fill_missing(1.0))
        .convert(&table)
        .unwrap();
    assertions::assert_same_table(&table, &before);
}
