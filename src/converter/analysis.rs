use serde_json::Value;

use crate::avro::{Field, Record, SchemaNode};

/// Return a readable type name for a field's Avro type.
///
/// Unions list their members separated by `,`.
pub fn get_field_type_name(field: &Field) -> String {
    type_name(&field.field_type)
}

fn type_name(node: &SchemaNode) -> String {
    match node {
        SchemaNode::Union(members) => members.iter().map(type_name).collect::<Vec<_>>().join(", "),
        SchemaNode::TypeRef(name) => name.clone(),
        other => other
            .fullname()
            .unwrap_or_else(|| other.kind_name().to_string()),
    }
}

/// Check if a JSON object represents an array.
pub fn is_array_object(json_object: &Value) -> bool {
    json_object.get("type").and_then(Value::as_str) == Some("array")
        || (json_object.get("type").is_none() && json_object.get("items").is_some())
}

/// Check if a JSON object describes an object: explicitly typed, or carrying
/// property keywords without a type.
pub fn is_object_like(json_object: &Value) -> bool {
    match json_object.get("type") {
        Some(Value::String(t)) => t == "object",
        Some(_) => false,
        None => ["properties", "additionalProperties", "patternProperties"]
            .iter()
            .any(|k| json_object.get(*k).is_some()),
    }
}

/// Check if an object schema declares at least one property.
pub fn has_properties(json_object: &Value) -> bool {
    json_object
        .get("properties")
        .and_then(Value::as_object)
        .is_some_and(|p| !p.is_empty())
}

/// True for the `<Name>_ref` forwarding record that breaks a reference cycle.
pub fn is_cycle_wrapper(record: &Record) -> bool {
    match record.fields.as_slice() {
        [field] => {
            record.name == format!("{}_ref", field.name)
                && matches!(&field.field_type, SchemaNode::TypeRef(target)
                    if target == &field.name || target.ends_with(&format!(".{}", field.name)))
        }
        _ => false,
    }
}
