use serde_json::Value;
use tracing::debug;

use crate::avro::{compose_fullname, Diagnostic, SchemaNode};
use crate::common::names::avro_name;
use crate::converter::conversion::json_type_to_avro_type;
use crate::converter::emptiness::{is_empty_json_type, is_empty_type};
use crate::converter::references::{local_uri, pointer_segment};
use crate::converter::state::{ResolutionContext, SchemaSource};
use crate::converter::structs::create_wrapper_record;
use crate::error::ResolveError;

/// A plain grouping object inside `definitions`, e.g.
/// `{"definitions": {"shapes": {"Circle": {...}, "Square": {...}}}}`.
fn is_definition_group(schema: &Value) -> bool {
    match schema.as_object() {
        Some(obj) => {
            !obj.is_empty() && is_empty_json_type(schema) && obj.values().all(Value::is_object)
        }
        None => false,
    }
}

/// Process a schema definition list (`$defs` or `definitions`) found at
/// `pointer` in the source document.
///
/// Definitions already registered through an earlier `$ref` are skipped. A
/// definition whose name another schema already took gets a numbered name.
pub fn process_definition_list(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    json_schema_list: &Value,
    pointer: &str,
) -> Result<(), ResolveError> {
    let Some(map) = json_schema_list.as_object() else {
        return Ok(());
    };
    for (sub_schema_name, schema) in map {
        let location = format!("{pointer}/{}", pointer_segment(sub_schema_name));
        if is_definition_group(schema) {
            process_definition_list(ctx, source, schema, &location)?;
            continue;
        }
        let uri = local_uri(source.base_uri, &location);
        let name = ctx.unclaimed_name(source.namespace, &avro_name(sub_schema_name), &uri);
        let fullname = compose_fullname(source.namespace, &name);
        if ctx.registry.contains(&fullname) {
            debug!("Definition {fullname} was already imported");
            continue;
        }
        ctx.claim(&fullname, &uri);
        if let Some(registered) = process_definition(ctx, source, &name, schema, false)? {
            ctx.imported_types.insert(uri, SchemaNode::TypeRef(registered));
        }
    }
    Ok(())
}

/// Process a single schema definition into the registry.
///
/// Returns the full name of the registered type. Unnamed shapes are only
/// registered at the root, where they are wrapped in a record.
pub fn process_definition(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    schema_name: &str,
    schema: &Value,
    is_root: bool,
) -> Result<Option<String>, ResolveError> {
    let mut dependencies = Vec::new();
    let avro_type = json_type_to_avro_type(
        ctx,
        source,
        schema,
        schema_name,
        "",
        source.namespace,
        &mut dependencies,
        0,
    )?;

    match avro_type {
        SchemaNode::Record(mut record) => {
            for dep in &dependencies {
                if *dep != record.fullname() {
                    record.add_dependency(dep);
                }
            }
            let node = SchemaNode::Record(record);
            Ok(Some(register_named(ctx, node)))
        }
        node @ (SchemaNode::Enum(_) | SchemaNode::Fixed(_)) => Ok(Some(register_named(ctx, node))),
        SchemaNode::TypeRef(target) if is_root => Ok(Some(target)),
        other if is_root => {
            let field = if matches!(other, SchemaNode::Union(_)) {
                "options"
            } else {
                "value"
            };
            let mut wrapper =
                create_wrapper_record(schema_name, source.namespace, field, &dependencies, other);
            if let Some(description) = schema.get("description").and_then(Value::as_str) {
                wrapper.doc = Some(description.to_string());
            }
            Ok(Some(register_named(ctx, SchemaNode::Record(wrapper))))
        }
        _ => Ok(None),
    }
}

fn register_named(ctx: &mut ResolutionContext<'_>, node: SchemaNode) -> String {
    let fullname = node.fullname().unwrap_or_default();
    if is_empty_type(&node) {
        ctx.diagnose(Diagnostic::EmptyType {
            name: fullname.clone(),
        });
    }
    ctx.registry.register(node);
    fullname
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::state::ConverterConfig;
    use serde_json::json;

    fn source(doc: &Value) -> SchemaSource<'_> {
        SchemaSource {
            document: doc,
            base_uri: "mem.json",
            namespace: "ns",
        }
    }

    #[test]
    fn test_definitions_and_groups_are_registered() {
        let doc = json!({
            "definitions": {
                "Color": {"enum": ["red", "green"]},
                "shapes": {
                    "Circle": {"type": "object", "properties": {"r": {"type": "number"}}}
                }
            }
        });
        let config = ConverterConfig::new("ns");
        let mut ctx = ResolutionContext::new(&config);
        process_definition_list(&mut ctx, source(&doc), &doc["definitions"], "/definitions").unwrap();
        assert!(ctx.registry.contains("ns.Color"));
        assert!(ctx.registry.contains("ns.Circle"));
    }

    #[test]
    fn test_root_primitive_is_wrapped() {
        let doc = json!({"type": "string", "description": "just text"});
        let config = ConverterConfig::new("ns");
        let mut ctx = ResolutionContext::new(&config);
        let name = process_definition(&mut ctx, source(&doc), "document", &doc, true).unwrap();
        assert_eq!(name.as_deref(), Some("ns.document"));
        let record = ctx.registry.get("ns.document").unwrap().as_record().unwrap();
        assert_eq!(record.fields[0].name, "value");
        assert_eq!(record.doc.as_deref(), Some("just text"));
    }

    #[test]
    fn test_non_root_primitive_is_not_registered() {
        let doc = json!({"type": "integer"});
        let config = ConverterConfig::new("ns");
        let mut ctx = ResolutionContext::new(&config);
        let name = process_definition(&mut ctx, source(&doc), "Count", &doc, false).unwrap();
        assert_eq!(name, None);
        assert!(ctx.registry.is_empty());
    }
}
