use avrotize_core::avro::json::{from_value, to_value};
use avrotize_core::canonical::{canonicalize, canonicalize_node, canonicalize_str};
use avrotize_core::fingerprint::{fingerprint, fingerprint_hex, Algorithm};
use avrotize_core::inference::infer;
use rstest::rstest;
use serde_json::json;

const COMPACT: &str = r#"{"type":"record","name":"Point","namespace":"geo","fields":[{"name":"x","type":"double"},{"name":"y","type":"double"}]}"#;

const DECORATED: &str = r#"
{
  "namespace": "geo",
  "doc": "A point on the plane",
  "name": "Point",
  "type": "record",
  "aliases": ["Pt"],
  "fields": [
    {"type": {"type": "double"}, "name": "x", "doc": "abscissa"},
    {"name": "y", "type": "double", "default": 0.0}
  ]
}"#;

#[rstest]
#[case(Algorithm::Sha256)]
#[case(Algorithm::Md5)]
#[case(Algorithm::Rabin)]
fn formatting_does_not_change_fingerprints(#[case] algorithm: Algorithm) {
    let a = canonicalize_str(COMPACT).unwrap();
    let b = canonicalize_str(DECORATED).unwrap();
    assert_eq!(a, b);
    assert_eq!(fingerprint(&a, algorithm), fingerprint(&b, algorithm));
}

#[test]
fn different_schemas_have_different_fingerprints() {
    let point = canonicalize_str(COMPACT).unwrap();
    let renamed = canonicalize_str(&COMPACT.replace("\"y\"", "\"z\"")).unwrap();
    assert_ne!(
        fingerprint_hex(&point, Algorithm::Sha256),
        fingerprint_hex(&renamed, Algorithm::Sha256)
    );
}

#[test]
fn canonical_form_of_inferred_schema() {
    let schema = infer("Reading", &[json!({"sensor": "t1", "value": 21.5, "ok": true})]);
    let pcf = canonicalize_node(&schema).unwrap();
    assert_eq!(
        pcf,
        r#"{"name":"Reading","type":"record","fields":[{"name":"sensor","type":"string"},{"name":"value","type":"double"},{"name":"ok","type":"boolean"}]}"#
    );
    assert_eq!(canonicalize_str(&pcf).unwrap(), pcf);
}

#[test]
fn ir_json_round_trip_keeps_canonical_form() {
    let value: serde_json::Value = serde_json::from_str(DECORATED).unwrap();
    let node = from_value(&value, "").unwrap();
    assert_eq!(canonicalize(&to_value(&node)).unwrap(), canonicalize(&value).unwrap());
}
