#![cfg(feature = "cli")]
use assert_cmd::Command;
use rstest::rstest;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn avrotize() -> Command {
    Command::cargo_bin("avrotize").unwrap()
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn run_fixture(schema_path: &str, stem: &str) -> Value {
    let dir = tempdir().unwrap();
    let input_path = dir.path().join(format!("{stem}.json"));
    let output_path = dir.path().join(format!("{stem}.avsc"));
    fs::copy(schema_path, &input_path).unwrap();

    avrotize()
        .arg("j2a")
        .arg(&input_path)
        .arg(&output_path)
        .assert()
        .success();

    read_json(&output_path)
}

#[rstest]
#[case("basic_string_schema")]
#[case("basic_string_schema_with_title")]
#[case("nested_object_and_array")]
#[case("object_with_boolean_and_number")]
#[case("enum_string_property")]
#[case("array_of_objects")]
#[case("object_with_optional")]
fn cli_fixtures_inline_the_root_record(#[case] stem: &str) {
    let schema_path = format!("tests/fixtures/jsonschema/{stem}.json");
    let avro = run_fixture(&schema_path, stem);
    assert_eq!(avro["type"], "record");
    assert_eq!(avro["name"], "document");
    // Without $id the namespace comes from the file name.
    assert_eq!(avro["namespace"], stem);
}

#[test]
fn cli_definitions_render_a_type_list() {
    let avro = run_fixture("tests/fixtures/jsonschema/object_with_defs.json", "object_with_defs");
    let names: Vec<&str> = avro
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert!(names.contains(&"Address"));
    assert!(names.contains(&"Customer"));
    // $id wins over the file name.
    assert_eq!(avro[0]["namespace"], "com.example.order.schemas");
}

#[test]
fn cli_split_writes_one_file_per_record() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("out");
    avrotize()
        .args(["j2a", "tests/fixtures/jsonschema/object_with_defs.json"])
        .arg(&out)
        .args(["--namespace", "shop", "--split-top-level-records"])
        .assert()
        .success();
    assert!(out.join("Address.avsc").exists());
    assert!(out.join("Customer.avsc").exists());
    assert_eq!(read_json(&out.join("Address.avsc"))["namespace"], "shop");
}

#[test]
fn cli_json2a_detects_event_variants() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("events.avsc");
    avrotize()
        .args(["json2a", "tests/fixtures/samples/events.jsonl"])
        .arg(&out)
        .args(["--type-name", "Event", "--namespace", "events"])
        .assert()
        .success();
    let avro = read_json(&out);
    let names: Vec<&str> = avro
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["UserSignup", "OrderPlaced", "Metric"]);

    let folded = dir.path().join("folded.avsc");
    avrotize()
        .args(["json2a", "tests/fixtures/samples/events.jsonl"])
        .arg(&folded)
        .args(["--type-name", "Event", "--no-choices"])
        .assert()
        .success();
    assert_eq!(read_json(&folded)["name"], "Event");
}

#[test]
fn cli_xml2a_names_the_record_after_the_root_tag() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("catalog.avsc");
    avrotize()
        .args(["xml2a", "tests/fixtures/samples/catalog.xml"])
        .arg(&out)
        .assert()
        .success();
    assert_eq!(read_json(&out)["name"], "catalog");
}

#[test]
fn cli_pcf_and_fingerprint() {
    let dir = tempdir().unwrap();
    let schema = dir.path().join("point.avsc");
    fs::write(
        &schema,
        r#"{"type": "record", "name": "Point", "doc": "x", "fields": [{"name": "x", "type": "int"}]}"#,
    )
    .unwrap();

    avrotize()
        .arg("pcf")
        .arg(&schema)
        .assert()
        .success()
        .stdout("{\"name\":\"Point\",\"type\":\"record\",\"fields\":[{\"name\":\"x\",\"type\":\"int\"}]}\n");

    let sha = avrotize().arg("fingerprint").arg(&schema).output().unwrap();
    let sha = String::from_utf8(sha.stdout).unwrap();
    assert_eq!(sha.trim().len(), 64);
    assert!(sha.trim().chars().all(|c| c.is_ascii_hexdigit()));

    let rabin = avrotize()
        .arg("fingerprint")
        .arg(&schema)
        .args(["--algorithm", "rabin"])
        .output()
        .unwrap();
    assert_eq!(String::from_utf8(rabin.stdout).unwrap().trim().len(), 12);
}

#[test]
fn cli_reports_errors_with_exit_code_one() {
    let dir = tempdir().unwrap();
    let bad = dir.path().join("bad.json");
    fs::write(&bad, r#"{"type": "object", "properties": {"x": {"type": "tuple"}}}"#).unwrap();
    avrotize()
        .arg("j2a")
        .arg(&bad)
        .arg(dir.path().join("bad.avsc"))
        .assert()
        .code(1);
}
