use avrotize_core::choice::{infer_choice, ChoiceConfig, ChoiceDetector, ChoiceResult};
use rstest::rstest;
use serde_json::{json, Value};

fn detect(docs: &[Value]) -> ChoiceResult {
    infer_choice(docs)
}

#[test]
fn tag_field_over_distinct_shapes() {
    let docs = vec![
        json!({"op": "create", "path": "/a", "body": "x", "mode": "0644"}),
        json!({"op": "delete", "target": "/b", "recursive": true}),
        json!({"op": "create", "path": "/c", "body": "y", "mode": "0600"}),
        json!({"op": "delete", "target": "/d", "recursive": false}),
    ];
    let result = detect(&docs);
    assert_eq!(result.discriminator_field(), Some("op"));
    let values: Vec<_> = result
        .clusters()
        .iter()
        .map(|c| c.discriminator_value.clone().unwrap())
        .collect();
    assert_eq!(values, vec!["create", "delete"]);
    assert_eq!(result.clusters()[0].members, vec![0, 2]);
}

#[test]
fn envelope_in_uniform_documents() {
    let docs = vec![
        json!({"type": "click", "click": {"x": 1}, "ts": "t1"}),
        json!({"type": "scroll", "scroll": {"dy": 2}, "ts": "t2"}),
        json!({"type": "click", "click": {"x": 3}, "ts": "t3"}),
        json!({"type": "scroll", "scroll": {"dy": 4}, "ts": "t4"}),
    ];
    let result = detect(&docs);
    assert!(result.is_choice());
    assert_eq!(result.discriminator_field(), Some("type"));
}

#[rstest]
#[case::optional_fields(vec![
    json!({"id": 1, "name": "Ann"}),
    json!({"id": 2, "name": "Bob", "age": 31}),
    json!({"id": 3, "name": "Cid", "email": "c@x.io"}),
    json!({"id": 4, "name": "Dee"}),
    json!({"id": 5, "name": "Eve", "age": 22}),
])]
#[case::status_flag(vec![
    json!({"status": "active", "id": "a", "name": "x"}),
    json!({"status": "inactive", "id": "b", "name": "y"}),
    json!({"status": "active", "id": "c", "name": "z"}),
    json!({"status": "inactive", "id": "d", "name": "w"}),
])]
#[case::sparse_optionals_under_a_status(vec![
    json!({"status": "active", "id": 1, "name": "Ann"}),
    json!({"status": "active", "id": 2, "name": "Bob", "age": 31}),
    json!({"status": "inactive", "id": 3, "name": "Cid", "email": "c@x.io"}),
    json!({"status": "inactive", "id": 4, "name": "Dee"}),
])]
#[case::boolean_like_values(vec![
    json!({"enabled": "yes", "a": 1}),
    json!({"enabled": "no", "b": 2}),
    json!({"enabled": "yes", "a": 3}),
])]
#[case::single_document(vec![json!({"kind": "a", "x": 1})])]
#[case::not_objects(vec![json!(1), json!("a"), json!([1, 2])])]
fn no_discriminator(#[case] docs: Vec<Value>) {
    let result = detect(&docs);
    assert!(result.discriminator_field().is_none(), "{result:?}");
}

#[test]
fn nested_discriminator_is_reported_with_its_path() {
    let docs = vec![
        json!({"meta": {"source": "s1"}, "data": {"shape": "line", "x1": 0, "x2": 1}}),
        json!({"meta": {"source": "s2"}, "data": {"shape": "dot", "cx": 0, "cy": 1, "r": 2}}),
        json!({"meta": {"source": "s3"}, "data": {"shape": "line", "x1": 2, "x2": 3}}),
        json!({"meta": {"source": "s4"}, "data": {"shape": "dot", "cx": 5, "cy": 6, "r": 1}}),
    ];
    let result = detect(&docs);
    assert_eq!(result.nested_path(), Some(&["data".to_string()][..]));
    assert_eq!(result.discriminator_field(), Some("shape"));
}

#[test]
fn stricter_similarity_splits_more() {
    let docs = vec![
        json!({"a": 1, "b": 2, "c": 3}),
        json!({"a": 1, "b": 2, "d": 4}),
    ];
    let refs: Vec<&Value> = docs.iter().collect();
    assert_eq!(ChoiceDetector::new().detect(&refs), ChoiceResult::NotAChoice);

    let strict = ChoiceDetector::with_config(ChoiceConfig {
        similarity_threshold: 0.9,
        ..ChoiceConfig::default()
    });
    let result = strict.detect(&refs);
    assert!(matches!(result, ChoiceResult::UndiscriminatedUnion { .. }));
    assert_eq!(result.clusters().len(), 2);
}

#[test]
fn results_serialize_with_a_kind_tag() {
    let docs = vec![
        json!({"kind": "a", "x": 1, "y": 2}),
        json!({"kind": "b", "p": 1, "q": 2}),
    ];
    let value = serde_json::to_value(detect(&docs)).unwrap();
    assert_eq!(value["kind"], "flatDiscriminatedUnion");
    assert_eq!(value["field"], "kind");
}
