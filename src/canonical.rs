//! Avro Parsing Canonical Form.
//!
//! Applies the PRIMITIVES, FULLNAMES, STRIP, ORDER, STRINGS, INTEGERS and
//! WHITESPACE transformations defined by Apache Avro. The output is a
//! fixed point: canonicalizing a canonical form returns it unchanged.

use serde_json::{Map, Value};

use crate::avro::{compose_fullname, json, split_fullname, PrimitiveKind, SchemaNode};
use crate::error::SchemaError;

/// Canonicalize schema text.
pub fn canonicalize_str(schema: &str) -> Result<String, SchemaError> {
    let value: Value = serde_json::from_str(schema)?;
    canonicalize(&value)
}

/// Canonicalize a parsed Avro schema.
pub fn canonicalize(schema: &Value) -> Result<String, SchemaError> {
    let mut out = String::new();
    write_canonical(schema, "", &mut out)?;
    Ok(out)
}

/// Canonicalize an IR node.
pub fn canonicalize_node(node: &SchemaNode) -> Result<String, SchemaError> {
    canonicalize(&json::to_value(node))
}

fn is_primitive(name: &str) -> bool {
    PrimitiveKind::parse(name).is_some()
}

fn write_string(s: &str, out: &mut String) -> Result<(), SchemaError> {
    out.push_str(&serde_json::to_string(s)?);
    Ok(())
}

fn write_canonical(schema: &Value, namespace: &str, out: &mut String) -> Result<(), SchemaError> {
    match schema {
        Value::String(name) if is_primitive(name) => write_string(name, out),
        Value::String(name) => write_string(&compose_fullname(namespace, name), out),
        Value::Array(members) => {
            out.push('[');
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(member, namespace, out)?;
            }
            out.push(']');
            Ok(())
        }
        Value::Object(obj) => write_object(obj, namespace, out),
        other => Err(SchemaError::InvalidSchema(format!(
            "unexpected schema node {other}"
        ))),
    }
}

fn write_object(obj: &Map<String, Value>, namespace: &str, out: &mut String) -> Result<(), SchemaError> {
    let ty = match obj.get("type") {
        Some(Value::String(t)) => t.as_str(),
        Some(inner @ (Value::Object(_) | Value::Array(_))) => {
            return write_canonical(inner, namespace, out)
        }
        _ => {
            return Err(SchemaError::InvalidSchema(format!(
                "schema object without a type: {}",
                Value::Object(obj.clone())
            )))
        }
    };

    if is_primitive(ty) {
        return write_string(ty, out);
    }

    let named = matches!(ty, "record" | "error" | "enum" | "fixed");
    let mut own_namespace = namespace.to_string();
    let mut fullname = None;
    if named {
        let name = obj
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| SchemaError::InvalidSchema(format!("{ty} without a name")))?;
        let full = if name.contains('.') {
            name.to_string()
        } else {
            let ns = obj
                .get("namespace")
                .and_then(Value::as_str)
                .unwrap_or(namespace);
            compose_fullname(ns, name)
        };
        own_namespace = split_fullname(&full).0.to_string();
        fullname = Some(full);
    } else if !matches!(ty, "array" | "map") {
        // A named reference written as {"type": "Name"}.
        return write_string(&compose_fullname(namespace, ty), out);
    }

    out.push('{');
    let mut first = true;
    let mut key = |k: &str, out: &mut String| -> Result<(), SchemaError> {
        if !first {
            out.push(',');
        }
        first = false;
        write_string(k, out)?;
        out.push(':');
        Ok(())
    };

    if let Some(full) = &fullname {
        key("name", out)?;
        write_string(full, out)?;
    }
    key("type", out)?;
    write_string(ty, out)?;

    if matches!(ty, "record" | "error") {
        key("fields", out)?;
        let fields = obj
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::InvalidSchema("record without fields".into()))?;
        out.push('[');
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let field_name = field
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| SchemaError::InvalidSchema(format!("field without name: {field}")))?;
            let field_type = field
                .get("type")
                .ok_or_else(|| SchemaError::InvalidSchema(format!("field {field_name} without type")))?;
            out.push_str("{\"name\":");
            write_string(field_name, out)?;
            out.push_str(",\"type\":");
            write_canonical(field_type, &own_namespace, out)?;
            out.push('}');
        }
        out.push(']');
    }
    if ty == "enum" {
        key("symbols", out)?;
        let symbols = obj
            .get("symbols")
            .and_then(Value::as_array)
            .ok_or_else(|| SchemaError::InvalidSchema("enum without symbols".into()))?;
        out.push('[');
        for (i, symbol) in symbols.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            let symbol = symbol
                .as_str()
                .ok_or_else(|| SchemaError::InvalidSchema(format!("enum symbol {symbol}")))?;
            write_string(symbol, out)?;
        }
        out.push(']');
    }
    if ty == "array" {
        key("items", out)?;
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::InvalidSchema("array without items".into()))?;
        write_canonical(items, namespace, out)?;
    }
    if ty == "map" {
        key("values", out)?;
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::InvalidSchema("map without values".into()))?;
        write_canonical(values, namespace, out)?;
    }
    if ty == "fixed" {
        key("size", out)?;
        let size = obj
            .get("size")
            .and_then(normalize_integer)
            .ok_or_else(|| SchemaError::InvalidSchema("fixed without a valid size".into()))?;
        out.push_str(&size.to_string());
    }
    out.push('}');
    Ok(())
}

fn normalize_integer(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => {
            let trimmed = s.trim().trim_start_matches('0');
            if trimmed.is_empty() {
                Some(0)
            } else {
                trimmed.parse().ok()
            }
        }
        _ => None,
    }
}
