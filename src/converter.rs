//! JSON Schema → Avro resolution.
//!
//! [`resolve`] walks a JSON Schema document (definitions, `$ref`s,
//! composition keywords, cycles) and produces a [`SchemaRegistry`] of named
//! Avro types in dependency order. [`jsons_to_avro`] renders that registry
//! as Avro schema JSON and [`convert_jsons_to_avro`] is the file-level
//! driver used by the CLI.

pub mod analysis;
pub mod composition;
pub mod conversion;
pub mod definitions;
pub mod emptiness;
pub mod merging;
pub mod postprocess;
pub mod references;
pub mod state;
pub mod structs;
pub mod types;
pub mod unions;
pub mod utils;

pub use state::{ConverterConfig, ResolutionContext, SchemaSource};

use definitions::{process_definition, process_definition_list};
use emptiness::is_empty_json_type;
use postprocess::postprocess_schema;
use references::{base_url, fetch_content, local_uri};
use utils::id_to_avro_namespace;

use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::avro::{compose_fullname, json, SchemaNode, SchemaRegistry};
use crate::common::names::{avro_name, avro_namespace};
use crate::error::ResolveError;

const DEFINITION_KEYS: [&str; 2] = ["definitions", "$defs"];

fn id_namespace(json_schema: &Value) -> Option<String> {
    json_schema
        .get("$id")
        .and_then(Value::as_str)
        .map(id_to_avro_namespace)
        .filter(|ns| !ns.is_empty())
}

fn process_definition_lists(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    json_schema: &Value,
) -> Result<(), ResolveError> {
    for key in DEFINITION_KEYS {
        if let Some(list) = json_schema.get(key) {
            process_definition_list(ctx, source, list, &format!("/{key}"))?;
        }
    }
    Ok(())
}

/// Resolve a JSON Schema document into a registry of Avro types.
///
/// The document is either a single schema, whose `definitions`/`$defs` and
/// root are converted, or an array of schemas converted one after another
/// into the same registry. Deferred `oneOf`/`anyOf` merges run once every
/// type exists, then the registry is sorted by dependencies.
pub fn resolve(
    json_schema: &Value,
    config: &ConverterConfig,
    base_uri: &str,
) -> Result<SchemaRegistry, ResolveError> {
    let mut ctx = ResolutionContext::new(config);

    match json_schema {
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                let namespace = id_namespace(item).unwrap_or_else(|| config.namespace.clone());
                let name = match item.get("title").and_then(Value::as_str) {
                    Some(title) => title.to_string(),
                    None => format!("{}{}", config.root_class_name, i + 1),
                };
                let source = SchemaSource {
                    document: item,
                    base_uri,
                    namespace: &namespace,
                };
                process_definition_lists(&mut ctx, source, item)?;
                if !is_empty_json_type(item) {
                    process_definition(&mut ctx, source, &name, item, true)?;
                }
            }
        }
        Value::Object(_) => {
            let source = SchemaSource {
                document: json_schema,
                base_uri,
                namespace: &config.namespace,
            };
            process_definition_lists(&mut ctx, source, json_schema)?;
            if !is_empty_json_type(json_schema) {
                let root_uri = local_uri(base_uri, "");
                let root_name =
                    ctx.unclaimed_name(&config.namespace, &avro_name(&config.root_class_name), &root_uri);
                ctx.claim(&compose_fullname(&config.namespace, &root_name), &root_uri);
                let root = process_definition(&mut ctx, source, &root_name, json_schema, true)?;
                if let Some(root) = &root {
                    ctx.imported_types
                        .insert(root_uri, SchemaNode::TypeRef(root.clone()));
                }
                ctx.registry.set_root(root);
            }
        }
        other => return Err(ResolveError::malformed("document", other)),
    }

    postprocess_schema(&mut ctx);
    let mut registry = ctx.into_registry();
    registry.sort_by_dependencies();
    debug!("Resolved {} named types", registry.len());
    Ok(registry)
}

/// Render a resolved registry as Avro schema JSON.
///
/// - `split_top_level` → an array holding only the records.
/// - a document without definitions → the root schema with every
///   dependency inlined.
/// - otherwise → the dependency-sorted array of all types.
pub fn render_registry(registry: &SchemaRegistry, json_schema: &Value, split_top_level: bool) -> Value {
    if split_top_level {
        return Value::Array(
            registry
                .iter()
                .filter(|t| matches!(t, SchemaNode::Record(_)))
                .map(json::to_value)
                .collect(),
        );
    }
    let has_definitions = DEFINITION_KEYS.iter().any(|k| json_schema.get(*k).is_some());
    if !has_definitions {
        if let Some(inlined) = registry.root().and_then(|root| registry.to_inlined_json(root)) {
            return inlined;
        }
    }
    registry.to_json()
}

/// Convert an in-memory JSON Schema into Avro schema JSON.
pub fn jsons_to_avro(
    json_schema: &Value,
    namespace: &str,
    utility_namespace: &str,
    base_uri: &str,
    split_top_level: bool,
) -> Result<Value, ResolveError> {
    let mut config = ConverterConfig::new(namespace).with_split_top_level_records(split_top_level);
    if !utility_namespace.is_empty() {
        config = config.with_utility_namespace(utility_namespace);
    }
    let registry = resolve(json_schema, &config, base_uri)?;
    Ok(render_registry(&registry, json_schema, split_top_level))
}

/// Convert a JSON Schema file (path or URL) into Avro schema file(s).
///
/// Without an explicit namespace, the namespace comes from the schema's
/// `$id` or, failing that, the input file name. With
/// `split_top_level_records`, `avro_schema_path` is a directory that
/// receives one `<Name>.avsc` per top-level record.
pub fn convert_jsons_to_avro(
    json_schema_file_path: &str,
    avro_schema_path: &str,
    namespace: Option<&str>,
    utility_namespace: Option<&str>,
    root_class_name: Option<&str>,
    split_top_level_records: bool,
) -> Result<(), ResolveError> {
    let mut config = ConverterConfig::new(namespace.unwrap_or_default())
        .with_split_top_level_records(split_top_level_records);
    if let Some(utility) = utility_namespace {
        config = config.with_utility_namespace(utility);
    }
    if let Some(root) = root_class_name {
        config = config.with_root_class_name(root);
    }
    convert_jsons_to_avro_with_config(json_schema_file_path, avro_schema_path, config)
}

/// [`convert_jsons_to_avro`] with a full [`ConverterConfig`].
pub fn convert_jsons_to_avro_with_config(
    json_schema_file_path: &str,
    avro_schema_path: &str,
    mut config: ConverterConfig,
) -> Result<(), ResolveError> {
    let url = base_url(json_schema_file_path)?;
    let content = fetch_content(&url, &mut HashMap::new())?;
    let json_schema: Value = serde_json::from_str(&content)?;

    if config.namespace.is_empty() {
        config.namespace = id_namespace(&json_schema).unwrap_or_else(|| {
            Path::new(url.path())
                .file_stem()
                .and_then(|s| s.to_str())
                .map(avro_namespace)
                .unwrap_or_default()
        });
    }
    info!(
        "Converting {json_schema_file_path} into namespace '{}'",
        config.namespace
    );

    let registry = resolve(&json_schema, &config, url.as_str())?;
    let avro_schema = render_registry(&registry, &json_schema, config.split_top_level_records);

    if config.split_top_level_records {
        fs::create_dir_all(avro_schema_path)?;
        for item in avro_schema.as_array().into_iter().flatten() {
            if let Some(name) = item.get("name").and_then(Value::as_str) {
                let file_path = Path::new(avro_schema_path).join(format!("{name}.avsc"));
                fs::write(&file_path, serde_json::to_string_pretty(item)?)?;
            }
        }
    } else {
        fs::write(avro_schema_path, serde_json::to_string_pretty(&avro_schema)?)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_without_definitions_is_inlined() {
        let schema = json!({
            "type": "object",
            "properties": {
                "name": {"type": "string"},
                "address": {
                    "type": "object",
                    "properties": {"city": {"type": "string"}},
                    "required": ["city"]
                }
            },
            "required": ["name"]
        });
        let avro = jsons_to_avro(&schema, "example", "", "mem.json", false).unwrap();
        assert_eq!(avro["type"], "record");
        assert_eq!(avro["name"], "document");
        assert_eq!(avro["fields"][0]["type"], "string");
        assert_eq!(avro["fields"][1]["type"][0], "null");
        assert_eq!(avro["fields"][1]["type"][1]["name"], "address");
        assert_eq!(avro["fields"][1]["type"][1]["namespace"], "example.document_types");
    }

    #[test]
    fn test_split_returns_records_only() {
        let schema = json!({
            "definitions": {
                "Color": {"enum": ["red", "blue"]},
                "Pixel": {
                    "type": "object",
                    "properties": {"color": {"$ref": "#/definitions/Color"}},
                    "required": ["color"]
                }
            }
        });
        let avro = jsons_to_avro(&schema, "img", "", "mem.json", true).unwrap();
        let names: Vec<_> = avro
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Pixel"]);
    }

    #[test]
    fn test_non_schema_document_is_malformed() {
        let err = resolve(&json!(42), &ConverterConfig::new("ns"), "mem.json").unwrap_err();
        assert!(matches!(err, ResolveError::MalformedSchema { .. }));
    }
}
