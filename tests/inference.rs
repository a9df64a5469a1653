use avrotize_core::avro::{SchemaNode, SchemaRegistry};
use avrotize_core::inference::xml::xml_to_document;
use avrotize_core::inference::{infer, InferenceConfig, StructureInferrer};
use avrotize_core::validate::validate;
use rstest::rstest;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;

fn events() -> Vec<Value> {
    fs::read_to_string("tests/fixtures/samples/events.jsonl")
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn member_names(node: &SchemaNode) -> BTreeSet<String> {
    match node {
        SchemaNode::Union(members) => members.iter().filter_map(SchemaNode::fullname).collect(),
        other => other.fullname().into_iter().collect(),
    }
}

#[rstest]
#[case::flat_records(vec![
    json!({"id": 1, "name": "Ann", "tags": ["a", "b"]}),
    json!({"id": 2, "name": null, "tags": []}),
    json!({"id": 3, "score": 2.5, "address": {"city": "Oslo", "zip": "0150"}}),
])]
#[case::mixed_scalars(vec![json!(1), json!("two"), json!(3.5), json!(null), json!(true)])]
#[case::events(events())]
#[case::nested_payload(vec![
    json!({"id": "1", "payload": {"kind": "circle", "radius": 1.0}}),
    json!({"id": "2", "payload": {"kind": "rect", "width": 2.0, "height": 1.0}}),
    json!({"id": "3", "payload": {"kind": "circle", "radius": 3.0}}),
    json!({"id": "4", "payload": {"kind": "rect", "width": 1.0, "height": 4.0}}),
])]
#[case::arrays_of_variants(vec![json!({"items": [
    {"type": "a", "x": 1, "y": "s", "z": true},
    {"type": "b", "p": "1", "q": 2, "r": [1]},
    {"type": "a", "x": 2, "y": "t", "z": false},
]})])]
#[case::renamed_keys(vec![json!({"first-name": "A", "first_name": "B", "1st": 1})])]
fn samples_validate_against_their_schema(#[case] samples: Vec<Value>) {
    let schema = StructureInferrer::with_config(InferenceConfig::new().with_namespace("samples"))
        .infer("Sample", &samples);
    let registry = SchemaRegistry::new();
    for sample in &samples {
        if let Err(e) = validate(sample, &schema, &registry) {
            panic!("{sample} does not validate: {e}");
        }
    }
}

#[test]
fn events_become_a_union_of_variant_records() {
    let schema = StructureInferrer::with_config(InferenceConfig::new().with_namespace("events"))
        .infer("Event", &events());
    let expected: BTreeSet<String> = ["events.UserSignup", "events.OrderPlaced", "events.Metric"]
        .into_iter()
        .map(String::from)
        .collect();
    assert_eq!(member_names(&schema), expected);

    let mut reversed = events();
    reversed.reverse();
    let schema = StructureInferrer::with_config(InferenceConfig::new().with_namespace("events"))
        .infer("Event", &reversed);
    assert_eq!(member_names(&schema), expected);
}

#[test]
fn disabling_choices_folds_into_one_record() {
    let schema = StructureInferrer::with_config(InferenceConfig::new().with_infer_choices(false))
        .infer("Event", &events());
    let record = schema.as_record().unwrap();
    assert_eq!(record.name, "Event");
    assert!(record.field("event_type").unwrap().default.is_none());
    assert!(record.field("plan").unwrap().field_type.is_nullable());
}

#[test]
fn nested_payload_becomes_variant_union() {
    let samples = vec![
        json!({"id": "1", "payload": {"kind": "circle", "radius": 1.0}}),
        json!({"id": "2", "payload": {"kind": "rect", "width": 2.0, "height": 1.0}}),
        json!({"id": "3", "payload": {"kind": "circle", "radius": 3.0}}),
    ];
    let schema = infer("Drawing", &samples);
    let record = schema.as_record().unwrap();
    let payload = &record.field("payload").unwrap().field_type;
    let names: BTreeSet<String> = member_names(payload);
    assert_eq!(
        names,
        ["Drawing_types.Circle", "Drawing_types.Rect"]
            .into_iter()
            .map(String::from)
            .collect()
    );
}

#[test]
fn xml_documents_infer_like_json() {
    let xml = fs::read_to_string("tests/fixtures/samples/catalog.xml").unwrap();
    let (root, document) = xml_to_document(&xml).unwrap();
    assert_eq!(root, "catalog");

    let schema = infer(&root, std::slice::from_ref(&document));
    let catalog = schema.as_record().unwrap();
    assert_eq!(catalog.name, "catalog");
    assert_eq!(catalog.field("_version").unwrap().json_name(), "@version");

    let SchemaNode::Array(books) = &catalog.field("book").unwrap().field_type else {
        panic!("repeated tags must infer an array");
    };
    let book = books.as_record().unwrap();
    assert_eq!(book.name, "BookItem");
    assert!(book.field("note").unwrap().field_type.is_nullable());
    assert!(book.field("price").unwrap().field_type.as_record().is_some());

    assert!(validate(&document, &schema, &SchemaRegistry::new()).is_ok());
}
