use serde_json::{json, Map, Value};

use crate::avro::Diagnostic;
use crate::common::names::{avro_name, pascal};
use crate::converter::references::resolve_reference;
use crate::converter::state::{ResolutionContext, SchemaSource};
use crate::error::ResolveError;

/// Keys whose first occurrence wins when schemas are merged.
const ANNOTATIONS: [&str; 6] = ["title", "description", "$id", "$schema", "$comment", "default"];

/// Merge two property schemas.
///
/// Schemas of the same type are merged recursively; schemas of different
/// types become the alternatives of a `oneOf`.
fn merge_property(existing: &Value, incoming: &Value) -> Value {
    if existing == incoming {
        return existing.clone();
    }
    let same_kind = match (existing.get("type"), incoming.get("type")) {
        (Some(a), Some(b)) => a == b,
        _ => existing.get("$ref").is_none() && incoming.get("$ref").is_none(),
    };
    if existing.is_object() && incoming.is_object() && same_kind {
        return merge_json_schemas(&[existing.clone(), incoming.clone()], false);
    }

    let mut options = match existing.as_object() {
        Some(obj) if obj.len() == 1 => match obj.get("oneOf") {
            Some(Value::Array(alternatives)) => alternatives.clone(),
            _ => vec![existing.clone()],
        },
        _ => vec![existing.clone()],
    };
    if !options.contains(incoming) {
        options.push(incoming.clone());
    }
    json!({ "oneOf": options })
}

fn push_unique(target: &mut Vec<Value>, values: impl IntoIterator<Item = Value>) {
    for value in values {
        if !target.contains(&value) {
            target.push(value);
        }
    }
}

fn as_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    }
}

fn required_of(schema: &Value) -> Option<Vec<Value>> {
    schema.get("required").and_then(Value::as_array).cloned()
}

/// Merge multiple JSON Schema objects into one.
///
/// Properties are unioned, conflicting property types escalate to `oneOf`,
/// differing `type`s become a type list and `enum` values are combined.
/// `required` is the union of all lists, or their intersection when
/// `intersect_required` is set.
pub fn merge_json_schemas(json_schemas: &[Value], intersect_required: bool) -> Value {
    let mut merged: Map<String, Value> = Map::new();
    let mut required: Option<Vec<Value>> = None;

    for schema in json_schemas {
        let Some(obj) = schema.as_object() else {
            continue;
        };
        for (key, value) in obj {
            match key.as_str() {
                "required" => {}
                "properties" => {
                    let Some(incoming) = value.as_object() else {
                        continue;
                    };
                    let target = merged
                        .entry("properties")
                        .or_insert_with(|| Value::Object(Map::new()));
                    if let Some(props) = target.as_object_mut() {
                        for (name, prop) in incoming {
                            let next = match props.get(name) {
                                Some(existing) => merge_property(existing, prop),
                                None => prop.clone(),
                            };
                            props.insert(name.clone(), next);
                        }
                    }
                }
                "type" => match merged.get_mut("type") {
                    Some(existing) if existing != value => {
                        let mut types = as_list(existing);
                        push_unique(&mut types, as_list(value));
                        *existing = Value::Array(types);
                    }
                    Some(_) => {}
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                },
                "enum" => match merged.get_mut("enum") {
                    Some(Value::Array(existing)) => push_unique(existing, as_list(value)),
                    _ => {
                        merged.insert(key.clone(), value.clone());
                    }
                },
                "items" | "additionalProperties" => match merged.get(key) {
                    Some(existing) if existing.is_object() && value.is_object() => {
                        let next = merge_property(existing, value);
                        merged.insert(key.clone(), next);
                    }
                    Some(_) => {}
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                },
                _ if ANNOTATIONS.contains(&key.as_str()) => {
                    merged.entry(key.clone()).or_insert_with(|| value.clone());
                }
                _ => match merged.get_mut(key) {
                    Some(Value::Object(existing)) if value.is_object() => {
                        if let Some(incoming) = value.as_object() {
                            for (k, v) in incoming {
                                existing.entry(k.clone()).or_insert_with(|| v.clone());
                            }
                        }
                    }
                    Some(_) => {}
                    None => {
                        merged.insert(key.clone(), value.clone());
                    }
                },
            }
        }

        if let Some(list) = required_of(schema) {
            required = Some(match required {
                None => list,
                Some(mut acc) if !intersect_required => {
                    push_unique(&mut acc, list);
                    acc
                }
                Some(acc) => acc.into_iter().filter(|r| list.contains(r)).collect(),
            });
        }
    }

    if let Some(required) = required {
        merged.insert("required".to_string(), Value::Array(required));
    }
    Value::Object(merged)
}

/// Expand a composition keyword into its merged alternatives.
///
/// - `allOf` → one schema merging the base with every subschema.
/// - `oneOf` → the base merged with each subschema.
/// - `anyOf` → like `oneOf`, with `required` intersected.
pub fn expand_composition(base: &Value, keyword: &str) -> Vec<Value> {
    let Some(obj) = base.as_object() else {
        return vec![base.clone()];
    };
    let Some(Value::Array(subschemas)) = obj.get(keyword) else {
        return vec![base.clone()];
    };
    let mut stripped = obj.clone();
    stripped.remove(keyword);
    let stripped = Value::Object(stripped);

    match keyword {
        "allOf" => {
            let mut schemas = vec![stripped];
            schemas.extend(subschemas.iter().cloned());
            vec![merge_json_schemas(&schemas, false)]
        }
        "oneOf" | "anyOf" => subschemas
            .iter()
            .map(|s| merge_json_schemas(&[stripped.clone(), s.clone()], keyword == "anyOf"))
            .collect(),
        _ => vec![base.clone()],
    }
}

/// Name of the `index`-th alternative of `name`: its title, or its position.
pub fn variant_name(name: &str, branch: &Value, index: usize) -> String {
    match branch.get("title").and_then(Value::as_str) {
        Some(title) => format!("{name}{}", pascal(&avro_name(title))),
        None => format!("{name}_{}", index + 1),
    }
}

/// Replace a `$ref` branch by the schema it points to.
///
/// An unresolvable branch is recorded and contributes nothing to the merge.
fn dereference_branch(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    branch: &Value,
) -> Value {
    let Some(reference) = branch.get("$ref").and_then(Value::as_str) else {
        return branch.clone();
    };
    match resolve_reference(reference, source, &mut ctx.content_cache) {
        Ok(resolved) => resolved.schema,
        Err(err) => {
            ctx.diagnose(Diagnostic::UnresolvableReference {
                reference: reference.to_string(),
                message: err.to_string(),
            });
            Value::Object(Map::new())
        }
    }
}

/// Merge an `allOf` into a single schema, dereferencing `$ref` branches and
/// flattening nested `allOf`s.
pub fn flatten_all_of(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    json_type: &Value,
    recursion_depth: usize,
) -> Result<Value, ResolveError> {
    let Some(obj) = json_type.as_object() else {
        return Ok(json_type.clone());
    };
    let Some(all_of) = obj.get("allOf") else {
        return Ok(json_type.clone());
    };
    let Some(branches) = all_of.as_array() else {
        return Err(ResolveError::malformed("allOf", json_type));
    };

    let mut base = obj.clone();
    base.remove("allOf");
    let mut schemas = vec![Value::Object(base)];
    for branch in branches {
        let branch = dereference_branch(ctx, source, branch);
        if branch.get("allOf").is_some() && recursion_depth < ctx.max_recursion_depth() {
            schemas.push(flatten_all_of(ctx, source, &branch, recursion_depth + 1)?);
        } else {
            schemas.push(branch);
        }
    }
    Ok(merge_json_schemas(&schemas, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::state::ConverterConfig;

    #[test]
    fn test_properties_union_and_required() {
        let merged = merge_json_schemas(
            &[
                json!({"type": "object", "properties": {"a": {"type": "string"}}, "required": ["a"]}),
                json!({"properties": {"b": {"type": "integer"}}, "required": ["b"]}),
            ],
            false,
        );
        assert_eq!(merged["properties"]["a"], json!({"type": "string"}));
        assert_eq!(merged["properties"]["b"], json!({"type": "integer"}));
        assert_eq!(merged["required"], json!(["a", "b"]));
    }

    #[test]
    fn test_intersected_required() {
        let merged = merge_json_schemas(
            &[json!({"required": ["a", "b"]}), json!({"required": ["b"]})],
            true,
        );
        assert_eq!(merged["required"], json!(["b"]));
    }

    #[test]
    fn test_conflicting_property_escalates_to_one_of() {
        let merged = merge_json_schemas(
            &[
                json!({"properties": {"v": {"type": "string"}}}),
                json!({"properties": {"v": {"type": "integer"}}}),
            ],
            false,
        );
        assert_eq!(
            merged["properties"]["v"],
            json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn test_expand_one_of() {
        let base = json!({
            "type": "object",
            "properties": {"id": {"type": "string"}},
            "oneOf": [
                {"properties": {"a": {"type": "string"}}},
                {"properties": {"b": {"type": "string"}}}
            ]
        });
        let variants = expand_composition(&base, "oneOf");
        assert_eq!(variants.len(), 2);
        assert!(variants[0].get("oneOf").is_none());
        assert!(variants[1]["properties"].get("id").is_some());
        assert!(variants[1]["properties"].get("b").is_some());
    }

    #[test]
    fn test_all_of_dereferences_branches() {
        let doc = json!({
            "definitions": {"Base": {"properties": {"id": {"type": "string"}}, "required": ["id"]}}
        });
        let config = ConverterConfig::new("ns");
        let mut ctx = ResolutionContext::new(&config);
        let source = SchemaSource {
            document: &doc,
            base_uri: "mem",
            namespace: "ns",
        };
        let schema = json!({
            "allOf": [
                {"$ref": "#/definitions/Base"},
                {"properties": {"name": {"type": "string"}}}
            ]
        });
        let merged = flatten_all_of(&mut ctx, source, &schema, 0).unwrap();
        assert!(merged["properties"].get("id").is_some());
        assert!(merged["properties"].get("name").is_some());
        assert_eq!(merged["required"], json!(["id"]));
    }

    #[test]
    fn test_variant_names() {
        assert_eq!(variant_name("Shape", &json!({"title": "circle"}), 0), "ShapeCircle");
        assert_eq!(variant_name("Shape", &json!({}), 1), "Shape_2");
    }
}
