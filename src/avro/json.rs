//! IR ⇄ Avro schema JSON.

use serde_json::{json, Map, Value};

use super::{
    compose_fullname, split_fullname, EnumType, Field, Fixed, LogicalType, Primitive,
    PrimitiveKind, Record, SchemaNode,
};
use crate::error::SchemaError;

/// Render a node as Avro schema JSON.
pub fn to_value(node: &SchemaNode) -> Value {
    match node {
        SchemaNode::Primitive(p) => primitive_to_value(p),
        SchemaNode::Record(r) => record_to_value(r),
        SchemaNode::Enum(e) => {
            let mut obj = Map::new();
            obj.insert("type".into(), json!("enum"));
            obj.insert("name".into(), json!(e.name));
            if !e.namespace.is_empty() {
                obj.insert("namespace".into(), json!(e.namespace));
            }
            obj.insert("symbols".into(), json!(e.symbols));
            if let Some(doc) = &e.doc {
                obj.insert("doc".into(), json!(doc));
            }
            Value::Object(obj)
        }
        SchemaNode::Fixed(f) => {
            let mut obj = Map::new();
            obj.insert("type".into(), json!("fixed"));
            obj.insert("name".into(), json!(f.name));
            if !f.namespace.is_empty() {
                obj.insert("namespace".into(), json!(f.namespace));
            }
            obj.insert("size".into(), json!(f.size));
            if let Some(lt) = &f.logical_type {
                obj.insert("logicalType".into(), json!(lt.name()));
            }
            Value::Object(obj)
        }
        SchemaNode::Array(items) => json!({"type": "array", "items": to_value(items)}),
        SchemaNode::Map(values) => json!({"type": "map", "values": to_value(values)}),
        SchemaNode::Union(members) => Value::Array(members.iter().map(to_value).collect()),
        SchemaNode::TypeRef(name) => Value::String(name.clone()),
    }
}

fn primitive_to_value(p: &Primitive) -> Value {
    match &p.logical_type {
        None => Value::String(p.kind.as_str().to_string()),
        Some(lt) => {
            let mut obj = Map::new();
            obj.insert("type".into(), json!(p.kind.as_str()));
            obj.insert("logicalType".into(), json!(lt.name()));
            if let LogicalType::Decimal { precision, scale } = lt {
                obj.insert("precision".into(), json!(precision));
                obj.insert("scale".into(), json!(scale));
            }
            Value::Object(obj)
        }
    }
}

fn record_to_value(r: &Record) -> Value {
    let mut obj = Map::new();
    obj.insert("type".into(), json!("record"));
    obj.insert("name".into(), json!(r.name));
    if !r.namespace.is_empty() {
        obj.insert("namespace".into(), json!(r.namespace));
    }
    if let Some(doc) = &r.doc {
        obj.insert("doc".into(), json!(doc));
    }
    let fields: Vec<Value> = r.fields.iter().map(field_to_value).collect();
    obj.insert("fields".into(), Value::Array(fields));
    Value::Object(obj)
}

fn field_to_value(f: &Field) -> Value {
    let mut obj = Map::new();
    obj.insert("name".into(), json!(f.name));
    obj.insert("type".into(), to_value(&f.field_type));
    if let Some(doc) = &f.doc {
        obj.insert("doc".into(), json!(doc));
    }
    if let Some(default) = &f.default {
        obj.insert("default".into(), default.clone());
    }
    if !f.altnames.is_empty() {
        obj.insert("altnames".into(), json!(f.altnames));
    }
    Value::Object(obj)
}

/// Parse Avro schema JSON into the IR.
///
/// Unqualified references are qualified with the nearest enclosing namespace.
pub fn from_value(value: &Value, namespace: &str) -> Result<SchemaNode, SchemaError> {
    match value {
        Value::String(s) => Ok(match PrimitiveKind::parse(s) {
            Some(kind) => SchemaNode::primitive(kind),
            None => SchemaNode::TypeRef(compose_fullname(namespace, s)),
        }),
        Value::Array(members) => Ok(SchemaNode::Union(
            members
                .iter()
                .map(|m| from_value(m, namespace))
                .collect::<Result<_, _>>()?,
        )),
        Value::Object(obj) => object_from_value(obj, namespace),
        other => Err(SchemaError::InvalidSchema(format!(
            "unexpected schema node {other}"
        ))),
    }
}

fn object_from_value(obj: &Map<String, Value>, namespace: &str) -> Result<SchemaNode, SchemaError> {
    let ty = match obj.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(inner @ (Value::Object(_) | Value::Array(_))) => return from_value(inner, namespace),
        _ => {
            return Err(SchemaError::InvalidSchema(format!(
                "schema object without a type: {}",
                Value::Object(obj.clone())
            )))
        }
    };

    if let Some(kind) = PrimitiveKind::parse(ty) {
        let logical_type = obj
            .get("logicalType")
            .and_then(Value::as_str)
            .and_then(|lt| parse_logical_type(lt, obj));
        return Ok(SchemaNode::Primitive(Primitive { kind, logical_type }));
    }

    let (own_namespace, name) = named_parts(obj, namespace);
    match ty {
        "record" | "error" => {
            let mut record = Record::new(&name, &own_namespace);
            record.doc = obj.get("doc").and_then(Value::as_str).map(String::from);
            let fields = obj
                .get("fields")
                .and_then(Value::as_array)
                .ok_or_else(|| SchemaError::InvalidSchema(format!("record {name} has no fields")))?;
            for field in fields {
                record.fields.push(field_from_value(field, &own_namespace)?);
            }
            Ok(SchemaNode::Record(record))
        }
        "enum" => {
            let symbols = obj
                .get("symbols")
                .and_then(Value::as_array)
                .ok_or_else(|| SchemaError::InvalidSchema(format!("enum {name} has no symbols")))?
                .iter()
                .filter_map(|s| s.as_str().map(String::from))
                .collect();
            Ok(SchemaNode::Enum(EnumType {
                name,
                namespace: own_namespace,
                symbols,
                doc: obj.get("doc").and_then(Value::as_str).map(String::from),
            }))
        }
        "fixed" => {
            let size = obj
                .get("size")
                .and_then(Value::as_u64)
                .ok_or_else(|| SchemaError::InvalidSchema(format!("fixed {name} has no size")))?;
            Ok(SchemaNode::Fixed(Fixed {
                name,
                namespace: own_namespace,
                size: size as usize,
                logical_type: obj
                    .get("logicalType")
                    .and_then(Value::as_str)
                    .and_then(|lt| parse_logical_type(lt, obj)),
            }))
        }
        "array" => {
            let items = obj
                .get("items")
                .ok_or_else(|| SchemaError::InvalidSchema("array without items".into()))?;
            Ok(SchemaNode::array(from_value(items, namespace)?))
        }
        "map" => {
            let values = obj
                .get("values")
                .ok_or_else(|| SchemaError::InvalidSchema("map without values".into()))?;
            Ok(SchemaNode::map(from_value(values, namespace)?))
        }
        other => Ok(SchemaNode::TypeRef(compose_fullname(namespace, other))),
    }
}

fn named_parts(obj: &Map<String, Value>, enclosing: &str) -> (String, String) {
    let raw = obj.get("name").and_then(Value::as_str).unwrap_or("");
    if raw.contains('.') {
        let (ns, name) = split_fullname(raw);
        return (ns.to_string(), name.to_string());
    }
    let ns = obj
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or(enclosing);
    (ns.to_string(), raw.to_string())
}

fn field_from_value(value: &Value, namespace: &str) -> Result<Field, SchemaError> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| SchemaError::InvalidSchema(format!("field without name: {value}")))?;
    let ty = value
        .get("type")
        .ok_or_else(|| SchemaError::InvalidSchema(format!("field {name} has no type")))?;
    let mut field = Field::new(name, from_value(ty, namespace)?);
    field.doc = value.get("doc").and_then(Value::as_str).map(String::from);
    field.default = value.get("default").cloned();
    if let Some(altnames) = value.get("altnames").and_then(Value::as_object) {
        for (purpose, alt) in altnames {
            if let Some(alt) = alt.as_str() {
                field.altnames.insert(purpose.clone(), alt.to_string());
            }
        }
    }
    Ok(field)
}

fn parse_logical_type(name: &str, obj: &Map<String, Value>) -> Option<LogicalType> {
    match name {
        "date" => Some(LogicalType::Date),
        "time-millis" => Some(LogicalType::TimeMillis),
        "timestamp-millis" => Some(LogicalType::TimestampMillis),
        "uuid" => Some(LogicalType::Uuid),
        "duration" => Some(LogicalType::Duration),
        "decimal" => Some(LogicalType::Decimal {
            precision: obj.get("precision").and_then(Value::as_u64).unwrap_or(0) as u32,
            scale: obj.get("scale").and_then(Value::as_u64).unwrap_or(0) as u32,
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_shape() {
        let mut record = Record::new("Person", "example");
        record.fields.push(Field::new("name", SchemaNode::string()));
        let mut age = Field::new(
            "age",
            SchemaNode::Union(vec![SchemaNode::null(), PrimitiveKind::Long.into()]),
        );
        age.default = Some(Value::Null);
        record.fields.push(age);

        let value = to_value(&SchemaNode::Record(record));
        assert_eq!(
            value,
            json!({
                "type": "record",
                "name": "Person",
                "namespace": "example",
                "fields": [
                    {"name": "name", "type": "string"},
                    {"name": "age", "type": ["null", "long"], "default": null}
                ]
            })
        );
    }

    #[test]
    fn test_parse_qualifies_references() {
        let schema = json!({
            "type": "record",
            "name": "Outer",
            "namespace": "a.b",
            "fields": [
                {"name": "inner", "type": "Inner"},
                {"name": "when", "type": {"type": "int", "logicalType": "date"}}
            ]
        });
        let node = from_value(&schema, "").unwrap();
        let record = node.as_record().unwrap();
        assert_eq!(record.fields[0].field_type, SchemaNode::TypeRef("a.b.Inner".into()));
        assert_eq!(
            record.fields[1].field_type,
            SchemaNode::Primitive(Primitive::with_logical_type(
                PrimitiveKind::Int,
                LogicalType::Date
            ))
        );
    }
}
