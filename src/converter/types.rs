use serde_json::{Map, Value};

use crate::avro::{
    compose_fullname, Fixed, LogicalType, Primitive, PrimitiveKind, SchemaNode,
};
use crate::converter::state::ResolutionContext;
use crate::error::ResolveError;

const UTILITY_DURATION: &str = "Duration";

fn is_outside_i32(obj: &Map<String, Value>) -> bool {
    ["minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum"]
        .iter()
        .filter_map(|k| obj.get(*k))
        .any(|bound| match bound.as_i64() {
            Some(v) => v < i32::MIN as i64 || v > i32::MAX as i64,
            None => bound.as_f64().is_some_and(|v| v.abs() > i32::MAX as f64),
        })
}

fn logical(kind: PrimitiveKind, logical_type: LogicalType) -> SchemaNode {
    SchemaNode::Primitive(Primitive::with_logical_type(kind, logical_type))
}

/// The shared `fixed(12)` duration type, registered in the utility namespace.
fn duration_type(ctx: &mut ResolutionContext<'_>, dependencies: &mut Vec<String>) -> SchemaNode {
    let namespace = ctx.utility_namespace();
    let fullname = compose_fullname(&namespace, UTILITY_DURATION);
    ctx.registry.register(SchemaNode::Fixed(Fixed {
        name: UTILITY_DURATION.to_string(),
        namespace,
        size: 12,
        logical_type: Some(LogicalType::Duration),
    }));
    if !dependencies.contains(&fullname) {
        dependencies.push(fullname.clone());
    }
    SchemaNode::TypeRef(fullname)
}

fn string_type(
    ctx: &mut ResolutionContext<'_>,
    obj: &Map<String, Value>,
    dependencies: &mut Vec<String>,
) -> SchemaNode {
    if obj.get("contentEncoding").and_then(Value::as_str) == Some("base64") {
        return PrimitiveKind::Bytes.into();
    }
    match obj.get("format").and_then(Value::as_str) {
        Some("date") => logical(PrimitiveKind::Int, LogicalType::Date),
        Some("date-time") => logical(PrimitiveKind::Long, LogicalType::TimestampMillis),
        Some("time") => logical(PrimitiveKind::Int, LogicalType::TimeMillis),
        Some("uuid") => logical(PrimitiveKind::String, LogicalType::Uuid),
        Some("duration") => duration_type(ctx, dependencies),
        Some("decimal") => decimal_type(obj),
        _ => SchemaNode::string(),
    }
}

fn decimal_type(obj: &Map<String, Value>) -> SchemaNode {
    let precision = obj.get("precision").and_then(Value::as_u64).unwrap_or(38) as u32;
    let scale = obj.get("scale").and_then(Value::as_u64).unwrap_or(0) as u32;
    logical(PrimitiveKind::Bytes, LogicalType::Decimal { precision, scale })
}

/// Convert a JSON Schema primitive into an Avro primitive.
///
/// Handles `string`, `integer`, `number`, `boolean` and `null`, with the
/// `format` annotations `date`, `date-time`, `time`, `uuid`, `duration`,
/// `decimal`, `int64` and `double`. An unknown type name is a malformed
/// schema.
pub fn json_schema_primitive_to_avro_type(
    ctx: &mut ResolutionContext<'_>,
    json_primitive: &str,
    json_object: &Map<String, Value>,
    dependencies: &mut Vec<String>,
) -> Result<SchemaNode, ResolveError> {
    let format = json_object.get("format").and_then(Value::as_str);
    let avro_type = match json_primitive {
        "string" => string_type(ctx, json_object, dependencies),
        "integer" => {
            if format == Some("int64") || is_outside_i32(json_object) {
                PrimitiveKind::Long.into()
            } else {
                PrimitiveKind::Int.into()
            }
        }
        "number" => match format {
            Some("double") => PrimitiveKind::Double.into(),
            Some("decimal") => decimal_type(json_object),
            _ => PrimitiveKind::Float.into(),
        },
        "boolean" => PrimitiveKind::Boolean.into(),
        "null" => SchemaNode::null(),
        other => {
            return Err(ResolveError::malformed(
                format!("type '{other}'"),
                &Value::Object(json_object.clone()),
            ))
        }
    };
    Ok(avro_type)
}

/// Primitive matching the JSON values of a non-string `enum` or `const`.
pub fn primitive_for_values(values: &[Value]) -> SchemaNode {
    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    let kind = if non_null.iter().all(|v| v.is_boolean()) && !non_null.is_empty() {
        PrimitiveKind::Boolean
    } else if non_null.iter().all(|v| v.is_i64() || v.is_u64()) && !non_null.is_empty() {
        let fits = non_null
            .iter()
            .all(|v| v.as_i64().is_some_and(|i| i32::try_from(i).is_ok()));
        if fits {
            PrimitiveKind::Int
        } else {
            PrimitiveKind::Long
        }
    } else if non_null.iter().all(|v| v.is_number()) && !non_null.is_empty() {
        PrimitiveKind::Double
    } else {
        PrimitiveKind::String
    };
    SchemaNode::primitive(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::state::ConverterConfig;
    use serde_json::json;

    fn convert(schema: Value) -> Result<SchemaNode, ResolveError> {
        let config = ConverterConfig::new("ns");
        let mut ctx = ResolutionContext::new(&config);
        let obj = schema.as_object().unwrap().clone();
        let ty = obj["type"].as_str().unwrap().to_string();
        json_schema_primitive_to_avro_type(&mut ctx, &ty, &obj, &mut Vec::new())
    }

    #[test]
    fn test_formats() {
        assert_eq!(
            convert(json!({"type": "string", "format": "date-time"})).unwrap(),
            logical(PrimitiveKind::Long, LogicalType::TimestampMillis)
        );
        assert_eq!(
            convert(json!({"type": "string", "contentEncoding": "base64"})).unwrap(),
            PrimitiveKind::Bytes.into()
        );
        assert_eq!(
            convert(json!({"type": "string", "format": "duration"})).unwrap(),
            SchemaNode::TypeRef("ns.utility.Duration".into())
        );
    }

    #[test]
    fn test_integer_width() {
        assert_eq!(convert(json!({"type": "integer"})).unwrap(), PrimitiveKind::Int.into());
        assert_eq!(
            convert(json!({"type": "integer", "maximum": 10_000_000_000_i64})).unwrap(),
            PrimitiveKind::Long.into()
        );
        assert_eq!(
            convert(json!({"type": "number", "format": "double"})).unwrap(),
            PrimitiveKind::Double.into()
        );
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let err = convert(json!({"type": "integr"})).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedSchema { .. }));
    }

    #[test]
    fn test_values_primitive() {
        assert_eq!(primitive_for_values(&[json!(1), json!(2)]), PrimitiveKind::Int.into());
        assert_eq!(primitive_for_values(&[json!(1.5)]), PrimitiveKind::Double.into());
        assert_eq!(primitive_for_values(&[json!(true)]), PrimitiveKind::Boolean.into());
    }
}
