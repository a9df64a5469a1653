use serde_json::Value;

use crate::avro::SchemaNode;

/// Keywords that give a JSON Schema object a shape.
const SHAPE_KEYWORDS: [&str; 11] = [
    "type",
    "$ref",
    "properties",
    "additionalProperties",
    "patternProperties",
    "items",
    "enum",
    "const",
    "allOf",
    "oneOf",
    "anyOf",
];

/// Check if the given Avro type is empty.
///
/// A type is empty if it is a record with no fields, an enum with no
/// symbols, a union whose members are all empty, or an array/map of an
/// empty type.
pub fn is_empty_type(avro_type: &SchemaNode) -> bool {
    match avro_type {
        SchemaNode::Record(r) => r.fields.is_empty() && r.unmerged.is_none(),
        SchemaNode::Enum(e) => e.symbols.is_empty(),
        SchemaNode::Union(members) => members.iter().all(is_empty_type),
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => is_empty_type(inner),
        _ => false,
    }
}

/// Check if the given JSON schema type is empty.
///
/// `null`, `true`, an object without any shape keyword (annotations only),
/// and a list of empty types are empty: they accept any value.
pub fn is_empty_json_type(json_type: &Value) -> bool {
    match json_type {
        Value::Null | Value::Bool(true) => true,
        Value::Array(items) => items.iter().all(is_empty_json_type),
        Value::Object(obj) => !SHAPE_KEYWORDS.iter().any(|k| obj.contains_key(*k)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{Field, Record};
    use serde_json::json;

    #[test]
    fn test_empty_avro_types() {
        assert!(is_empty_type(&SchemaNode::Record(Record::new("A", "ns"))));
        let mut full = Record::new("B", "ns");
        full.fields.push(Field::new("x", SchemaNode::string()));
        assert!(!is_empty_type(&SchemaNode::array(SchemaNode::Record(full))));
        assert!(!is_empty_type(&SchemaNode::string()));
    }

    #[test]
    fn test_empty_json_types() {
        assert!(is_empty_json_type(&json!({})));
        assert!(is_empty_json_type(&json!({"description": "anything"})));
        assert!(is_empty_json_type(&json!(true)));
        assert!(!is_empty_json_type(&json!(false)));
        assert!(!is_empty_json_type(&json!({"properties": {}})));
    }
}
