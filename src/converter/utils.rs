use serde_json::Value;
use url::Url;

use crate::common::names::avro_namespace;

/// Compose a namespace string from multiple parts.
///
/// Empty parts are skipped. Each part is normalized with `avro_namespace`.
pub fn compose_namespace(parts: &[&str]) -> String {
    parts
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| avro_namespace(p))
        .collect::<Vec<_>>()
        .join(".")
}

/// Namespace of the types nested inside `record_name`: `<namespace>.<record_name>_types`.
pub fn nested_namespace(namespace: &str, record_name: &str) -> String {
    compose_namespace(&[namespace, &format!("{record_name}_types")])
}

/// Append a JSON Schema `description` to an Avro `doc`.
pub fn merge_description_into_doc(source_json: &Value, doc: &mut Option<String>) {
    if let Some(desc) = source_json.get("description").and_then(Value::as_str) {
        *doc = Some(match doc.take() {
            Some(existing) if !existing.is_empty() => format!("{existing}, {desc}"),
            _ => desc.to_string(),
        });
    }
}

/// Convert a JSON Schema `$id` URI into an Avro namespace.
///
/// Host segments are reversed and followed by the reversed path segments;
/// the file extension is dropped and `-` becomes `_`. Returns an empty
/// string for anything that is not an absolute URI.
pub fn id_to_avro_namespace(id: &str) -> String {
    let Ok(parsed_url) = Url::parse(id) else {
        return String::new();
    };

    let path_no_ext = {
        let path = parsed_url.path().trim_matches('/');
        let before_dot = path.split('.').next().unwrap_or("");
        before_dot.replace('-', "_")
    };
    let reversed_path_segments: Vec<&str> =
        path_no_ext.split('/').filter(|s| !s.is_empty()).rev().collect();
    let namespace_suffix = compose_namespace(&reversed_path_segments);

    let namespace_prefix = parsed_url
        .host_str()
        .map(|h| {
            let parts: Vec<&str> = h.split('.').rev().collect();
            compose_namespace(&parts)
        })
        .unwrap_or_default();

    compose_namespace(&[&namespace_prefix, &namespace_suffix])
}
