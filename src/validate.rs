//! Instance validation against the IR.
//!
//! Used to check that every sample a schema was inferred from still
//! conforms to it. Only type shape is checked.

use serde_json::Value;

use crate::avro::{PrimitiveKind, Record, SchemaNode, SchemaRegistry};
use crate::common::names::avro_name;
use crate::converter::analysis::is_cycle_wrapper;
use crate::error::ValidationError;

/// Validate `value` against `node`, resolving `TypeRef`s through `registry`.
pub fn validate(value: &Value, node: &SchemaNode, registry: &SchemaRegistry) -> Result<(), ValidationError> {
    check(value, node, registry, "$")
}

/// Validate against a registry's root type.
pub fn validate_root(value: &Value, registry: &SchemaRegistry) -> Result<(), ValidationError> {
    let root = registry
        .root()
        .ok_or_else(|| ValidationError::new("$", "registry has no root type"))?;
    let node = registry
        .get(root)
        .ok_or_else(|| ValidationError::new("$", format!("root type {root} is not registered")))?;
    validate(value, node, registry)
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn mismatch(path: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::new(path, format!("expected {expected}, found {}", describe(value)))
}

fn check_primitive(value: &Value, kind: PrimitiveKind, path: &str) -> Result<(), ValidationError> {
    let ok = match kind {
        PrimitiveKind::Null => value.is_null(),
        PrimitiveKind::Boolean => value.is_boolean(),
        PrimitiveKind::Int => value
            .as_i64()
            .is_some_and(|n| i32::try_from(n).is_ok()),
        PrimitiveKind::Long => value.is_i64() || value.is_u64(),
        PrimitiveKind::Float | PrimitiveKind::Double => value.is_number(),
        PrimitiveKind::Bytes | PrimitiveKind::String => value.is_string(),
    };
    if ok {
        Ok(())
    } else {
        Err(mismatch(path, kind.as_str(), value))
    }
}

fn check_record(
    value: &Value,
    record: &Record,
    registry: &SchemaRegistry,
    path: &str,
) -> Result<(), ValidationError> {
    if is_cycle_wrapper(record) {
        return check(value, &record.fields[0].field_type, registry, path);
    }
    let obj = value
        .as_object()
        .ok_or_else(|| mismatch(path, &format!("record {}", record.name), value))?;

    for field in &record.fields {
        let key = field.json_name();
        let field_path = format!("{path}.{key}");
        match obj.get(key) {
            Some(child) => check(child, &field.field_type, registry, &field_path)?,
            None if field.field_type.is_nullable() || field.default.is_some() => {}
            None => return Err(ValidationError::new(&field_path, "required field is missing")),
        }
    }
    if let Some(unknown) = obj
        .keys()
        .find(|k| !record.fields.iter().any(|f| f.json_name() == k.as_str()))
    {
        return Err(ValidationError::new(
            &format!("{path}.{unknown}"),
            format!("unknown field for record {}", record.name),
        ));
    }
    Ok(())
}

fn check(value: &Value, node: &SchemaNode, registry: &SchemaRegistry, path: &str) -> Result<(), ValidationError> {
    match node {
        SchemaNode::Primitive(p) => check_primitive(value, p.kind, path),
        SchemaNode::Record(record) => check_record(value, record, registry, path),
        SchemaNode::Enum(e) => {
            let symbol = value.as_str().ok_or_else(|| mismatch(path, "an enum symbol", value))?;
            if e.symbols.iter().any(|s| s == symbol || *s == avro_name(symbol)) {
                Ok(())
            } else {
                Err(ValidationError::new(path, format!("{symbol} is not a symbol of {}", e.name)))
            }
        }
        SchemaNode::Fixed(_) => check_primitive(value, PrimitiveKind::String, path),
        SchemaNode::Array(items) => {
            let elements = value.as_array().ok_or_else(|| mismatch(path, "an array", value))?;
            for (i, element) in elements.iter().enumerate() {
                check(element, items, registry, &format!("{path}[{i}]"))?;
            }
            Ok(())
        }
        SchemaNode::Map(values) => {
            let entries = value.as_object().ok_or_else(|| mismatch(path, "a map", value))?;
            for (key, entry) in entries {
                check(entry, values, registry, &format!("{path}.{key}"))?;
            }
            Ok(())
        }
        SchemaNode::Union(members) => {
            if members.iter().any(|m| check(value, m, registry, path).is_ok()) {
                return Ok(());
            }
            // A nullable slot reports the error of its single non-null member.
            let mut non_null = members.iter().filter(|m| !m.is_null());
            match (non_null.next(), non_null.next()) {
                (Some(only), None) if !value.is_null() => check(value, only, registry, path),
                _ => Err(ValidationError::new(
                    path,
                    format!("{} matches no union member", describe(value)),
                )),
            }
        }
        SchemaNode::TypeRef(target) => {
            let resolved = registry
                .get(target)
                .ok_or_else(|| ValidationError::new(path, format!("unknown type {target}")))?;
            check(value, resolved, registry, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::Field;
    use serde_json::json;

    fn person() -> SchemaNode {
        let mut r = Record::new("Person", "ns");
        r.fields.push(Field::new("id", PrimitiveKind::Int.into()));
        let mut name = Field::new("first_name", SchemaNode::string());
        name.altnames.insert("json".to_string(), "first-name".to_string());
        r.fields.push(name);
        r.fields.push(Field::new(
            "tags",
            SchemaNode::Union(vec![SchemaNode::null(), SchemaNode::array(SchemaNode::string())]),
        ));
        SchemaNode::Record(r)
    }

    #[test]
    fn test_record_fields_and_json_names() {
        let registry = SchemaRegistry::new();
        let schema = person();
        assert!(validate(&json!({"id": 1, "first-name": "Ann"}), &schema, &registry).is_ok());
        assert!(validate(&json!({"id": 1, "first-name": "Ann", "tags": ["a"]}), &schema, &registry).is_ok());

        let err = validate(&json!({"id": 1}), &schema, &registry).unwrap_err();
        assert_eq!(err.path, "$.first-name");
        let err = validate(&json!({"id": 1, "first-name": "A", "x": 1}), &schema, &registry).unwrap_err();
        assert_eq!(err.path, "$.x");
        let err = validate(&json!({"id": 1, "first-name": "A", "tags": [1]}), &schema, &registry).unwrap_err();
        assert_eq!(err.path, "$.tags[0]");
    }

    #[test]
    fn test_int_range() {
        let registry = SchemaRegistry::new();
        let int = SchemaNode::primitive(PrimitiveKind::Int);
        assert!(validate(&json!(2147483647), &int, &registry).is_ok());
        assert!(validate(&json!(2147483648i64), &int, &registry).is_err());
        let long = SchemaNode::primitive(PrimitiveKind::Long);
        assert!(validate(&json!(2147483648i64), &long, &registry).is_ok());
        assert!(validate(&json!(1.5), &long, &registry).is_err());
    }

    #[test]
    fn test_type_refs_resolve_through_registry() {
        let mut registry = SchemaRegistry::new();
        let mut node = Record::new("Node", "ns");
        node.fields.push(Field::new(
            "next",
            SchemaNode::Union(vec![SchemaNode::null(), SchemaNode::TypeRef("ns.Node".to_string())]),
        ));
        registry.register(SchemaNode::Record(node));
        let root = SchemaNode::TypeRef("ns.Node".to_string());
        assert!(validate(&json!({"next": {"next": null}}), &root, &registry).is_ok());
        let err = validate(&json!({"next": {"next": 3}}), &root, &registry).unwrap_err();
        assert_eq!(err.path, "$.next.next");
        assert!(validate(&json!({}), &SchemaNode::TypeRef("ns.Missing".to_string()), &registry).is_err());
    }
}
