//! End-to-end pipeline runs over in-memory datasets.

use csv_impute::dataset::{Cell, Dataset, Value};
use csv_impute::plan;
use csv_impute::request::{ColumnRequest, HandlingDefaults, ReplacementKind};
use csv_impute::schema::{ColumnMeta, ColumnType, ItemKind, Schema, SlotTag};

fn scalar(value: Option<f64>) -> Cell {
    Cell::Scalar(value.map(Value::Float))
}

fn int_slots(values: &[Option<i64>]) -> Cell {
    Cell::Vector(values.iter().map(|v| v.map(Value::Integer)).collect())
}

#[test]
fn scalar_mean_with_indicator_concatenates_into_the_destination() {
    let schema = Schema::new(vec![ColumnMeta::new(
        "Age",
        ColumnType::Scalar(ItemKind::Float),
    )]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![scalar(Some(25.0))]).unwrap();
    data.push_row(vec![scalar(None)]).unwrap();
    data.push_row(vec![scalar(Some(35.0))]).unwrap();

    let mut request = ColumnRequest::new("Age", "Age");
    request.kind = Some(ReplacementKind::Mean);
    request.concat_indicator = Some(true);
    let pipeline =
        plan::assemble(&data.schema, &[request], &HandlingDefaults::default()).expect("assemble");
    let result = pipeline.apply(data).expect("apply");

    // Exactly the requested column survives, with no temp names.
    assert_eq!(result.schema.headers(), vec!["Age".to_string()]);
    let meta = result.schema.column("Age").expect("age column");
    assert_eq!(meta.datatype, ColumnType::Vector(ItemKind::Float));
    assert_eq!(
        meta.slot_tags,
        vec![
            SlotTag {
                name: "Age".to_string(),
                width: 1
            },
            SlotTag {
                name: "IsMissing.Age".to_string(),
                width: 1
            },
        ]
    );

    let cells = result.column_cells("Age").expect("cells");
    assert_eq!(
        cells[0],
        Cell::Vector(vec![Some(Value::Float(25.0)), Some(Value::Float(0.0))])
    );
    assert_eq!(
        cells[1],
        Cell::Vector(vec![Some(Value::Float(30.0)), Some(Value::Float(1.0))])
    );
    assert_eq!(
        cells[2],
        Cell::Vector(vec![Some(Value::Float(35.0)), Some(Value::Float(0.0))])
    );
}

#[test]
fn bare_replacement_fills_defaults_in_place() {
    let schema = Schema::new(vec![ColumnMeta::new(
        "X",
        ColumnType::Scalar(ItemKind::Float),
    )]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![scalar(None)]).unwrap();
    data.push_row(vec![scalar(Some(4.5))]).unwrap();

    let mut request = ColumnRequest::new("X", "X");
    request.concat_indicator = Some(false);
    let pipeline =
        plan::assemble(&data.schema, &[request], &HandlingDefaults::default()).expect("assemble");
    let result = pipeline.apply(data).expect("apply");

    assert_eq!(result.schema.headers(), vec!["X".to_string()]);
    assert_eq!(
        result.schema.column("X").unwrap().datatype,
        ColumnType::Scalar(ItemKind::Float)
    );
    let cells = result.column_cells("X").expect("cells");
    assert_eq!(cells[0], Cell::Scalar(Some(Value::Float(0.0))));
    assert_eq!(cells[1], Cell::Scalar(Some(Value::Float(4.5))));
}

#[test]
fn vector_by_slot_statistics_fill_each_slot_independently() {
    let schema = Schema::new(vec![ColumnMeta::new(
        "scores",
        ColumnType::Vector(ItemKind::Integer),
    )]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![int_slots(&[Some(10), None, Some(7)])])
        .unwrap();
    data.push_row(vec![int_slots(&[Some(2), Some(5), None])])
        .unwrap();
    data.push_row(vec![int_slots(&[None, Some(9), Some(3)])])
        .unwrap();

    let mut request = ColumnRequest::new("scores", "scores");
    request.kind = Some(ReplacementKind::Minimum);
    request.concat_indicator = Some(true);
    request.impute_by_slot = Some(true);
    let pipeline =
        plan::assemble(&data.schema, &[request], &HandlingDefaults::default()).expect("assemble");
    let result = pipeline.apply(data).expect("apply");

    let cells = result.column_cells("scores").expect("cells");
    // Slot minima are 2, 5, 3; indicator slots are integers after conversion.
    assert_eq!(
        cells[0],
        Cell::Vector(vec![
            Some(Value::Integer(10)),
            Some(Value::Integer(5)),
            Some(Value::Integer(7)),
            Some(Value::Integer(0)),
            Some(Value::Integer(1)),
            Some(Value::Integer(0)),
        ])
    );
    assert_eq!(
        cells[2],
        Cell::Vector(vec![
            Some(Value::Integer(2)),
            Some(Value::Integer(9)),
            Some(Value::Integer(3)),
            Some(Value::Integer(1)),
            Some(Value::Integer(0)),
            Some(Value::Integer(0)),
        ])
    );

    let meta = result.schema.column("scores").expect("meta");
    assert_eq!(meta.datatype, ColumnType::Vector(ItemKind::Integer));
    assert_eq!(meta.slot_tags[0].name, "Replace_temp0");
    assert_eq!(meta.slot_tags[1].name, "IsMissing");
}

#[test]
fn pooled_statistics_share_one_value_across_slots() {
    let schema = Schema::new(vec![ColumnMeta::new(
        "scores",
        ColumnType::Vector(ItemKind::Integer),
    )]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![int_slots(&[Some(10), None])]).unwrap();
    data.push_row(vec![int_slots(&[Some(2), Some(6)])]).unwrap();

    let mut request = ColumnRequest::new("scores", "scores");
    request.kind = Some(ReplacementKind::Maximum);
    request.concat_indicator = Some(false);
    request.impute_by_slot = Some(false);
    let pipeline =
        plan::assemble(&data.schema, &[request], &HandlingDefaults::default()).expect("assemble");
    let result = pipeline.apply(data).expect("apply");

    let cells = result.column_cells("scores").expect("cells");
    assert_eq!(
        cells[0],
        Cell::Vector(vec![Some(Value::Integer(10)), Some(Value::Integer(10))])
    );
}

#[test]
fn request_order_fixes_the_output_layout() {
    let schema = Schema::new(vec![
        ColumnMeta::new("a", ColumnType::Scalar(ItemKind::Float)),
        ColumnMeta::new("b", ColumnType::Scalar(ItemKind::Float)),
    ]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![scalar(None), scalar(Some(1.0))]).unwrap();

    let requests = vec![ColumnRequest::new("a", "a"), ColumnRequest::new("b", "b")];
    let pipeline =
        plan::assemble(&data.schema, &requests, &HandlingDefaults::default()).expect("assemble");
    let result = pipeline.apply(data).expect("apply");
    assert_eq!(result.schema.headers(), vec!["a".to_string(), "b".to_string()]);
    for column in &result.schema.columns {
        assert!(!column.name.contains("_temp"));
    }
}

#[test]
fn unsupported_statistic_surfaces_as_a_stage_error() {
    let schema = Schema::new(vec![ColumnMeta::new(
        "when",
        ColumnType::Scalar(ItemKind::Date),
    )]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![Cell::Scalar(None)]).unwrap();

    // Dates cannot absorb an indicator, so plan a bare mean replacement; the
    // planner accepts it and the replacement stage rejects the statistic.
    let mut request = ColumnRequest::new("when", "when");
    request.kind = Some(ReplacementKind::Mean);
    request.concat_indicator = Some(false);
    let pipeline =
        plan::assemble(&data.schema, &[request], &HandlingDefaults::default()).expect("assemble");
    let err = pipeline.apply(data).unwrap_err();
    assert!(format!("{err:#}").contains("Mean replacement is not supported"));
}

#[test]
fn destination_may_differ_from_the_source() {
    let schema = Schema::new(vec![ColumnMeta::new(
        "Age",
        ColumnType::Scalar(ItemKind::Float),
    )]);
    let mut data = Dataset::new(schema);
    data.push_row(vec![scalar(None)]).unwrap();
    data.push_row(vec![scalar(Some(40.0))]).unwrap();

    let mut request = ColumnRequest::new("Age", "AgeFilled");
    request.kind = Some(ReplacementKind::Maximum);
    let pipeline =
        plan::assemble(&data.schema, &[request], &HandlingDefaults::default()).expect("assemble");
    let result = pipeline.apply(data).expect("apply");

    assert_eq!(
        result.schema.headers(),
        vec!["Age".to_string(), "AgeFilled".to_string()]
    );
    let cells = result.column_cells("AgeFilled").expect("cells");
    assert_eq!(
        cells[0],
        Cell::Vector(vec![Some(Value::Float(40.0)), Some(Value::Float(1.0))])
    );
    // The original column is untouched.
    let original = result.column_cells("Age").expect("cells");
    assert_eq!(original[0], Cell::Scalar(None));
}
