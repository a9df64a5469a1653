use serde_json::{Map, Value};

use crate::avro::{compose_fullname, split_fullname, Diagnostic, Field, SchemaNode, UnmergedTypes};
use crate::common::generic::generic_type;
use crate::common::names::{avro_name, avro_name_with_altname};
use crate::converter::analysis::{
    has_properties, is_array_object, is_object_like, get_field_type_name,
};
use crate::converter::composition::{
    expand_composition, flatten_all_of, merge_json_schemas, variant_name,
};
use crate::converter::emptiness::{is_empty_json_type, is_empty_type};
use crate::converter::references::resolve_reference;
use crate::converter::state::{ResolutionContext, SchemaSource};
use crate::converter::structs::{
    create_avro_record, create_enum_type, create_wrapper_record, nullable, optional_field,
};
use crate::converter::types::{json_schema_primitive_to_avro_type, primitive_for_values};
use crate::converter::unions::make_union;
use crate::converter::utils::{merge_description_into_doc, nested_namespace};
use crate::error::ResolveError;
use tracing::debug;

fn push_dependency(dependencies: &mut Vec<String>, fullname: &str) {
    if !dependencies.iter().any(|d| d == fullname) {
        dependencies.push(fullname.to_string());
    }
}

fn cycle_reference(
    ctx: &mut ResolutionContext<'_>,
    target: &str,
    dependencies: &mut Vec<String>,
) -> SchemaNode {
    let node = ctx.cycle_reference(target);
    if let SchemaNode::TypeRef(wrapper) = &node {
        debug!("Breaking reference cycle at {target} with {wrapper}");
        push_dependency(dependencies, wrapper);
    }
    node
}

/// Resolve a `$ref` to a `TypeRef` of a registered type or an inline shape.
///
/// The target is pre-registered under its qualified name before it is
/// converted, so re-entering it yields the `*_ref` cycle wrapper instead of
/// recursing. Fetch failures degrade to the generic placeholder.
fn ref_to_avro_type(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    reference: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<SchemaNode, ResolveError> {
    let resolved = match resolve_reference(reference, source, &mut ctx.content_cache) {
        Ok(resolved) => resolved,
        Err(err) => {
            ctx.diagnose(Diagnostic::UnresolvableReference {
                reference: reference.to_string(),
                message: err.to_string(),
            });
            return Ok(generic_type());
        }
    };

    if let Some(existing) = ctx.imported_types.get(&resolved.uri).cloned() {
        return Ok(match existing {
            SchemaNode::TypeRef(name) if ctx.is_building(&name) => {
                cycle_reference(ctx, &name, dependencies)
            }
            SchemaNode::TypeRef(name) => {
                push_dependency(dependencies, &name);
                SchemaNode::TypeRef(name)
            }
            inline => inline,
        });
    }

    let qualified = match ctx.claimed_name(&resolved.uri) {
        Some(fullname) => fullname,
        None => {
            let name = ctx.unclaimed_name(&resolved.namespace, &resolved.type_name, &resolved.uri);
            compose_fullname(&resolved.namespace, &name)
        }
    };
    let (_, type_name) = split_fullname(&qualified);
    let type_name = type_name.to_string();
    if ctx.is_building(&qualified) {
        return Ok(cycle_reference(ctx, &qualified, dependencies));
    }
    if ctx.registry.contains(&qualified) {
        ctx.imported_types
            .insert(resolved.uri.clone(), SchemaNode::TypeRef(qualified.clone()));
        push_dependency(dependencies, &qualified);
        return Ok(SchemaNode::TypeRef(qualified));
    }

    ctx.claim(&qualified, &resolved.uri);
    ctx.imported_types
        .insert(resolved.uri.clone(), SchemaNode::TypeRef(qualified.clone()));
    let child = SchemaSource {
        document: resolved.document.as_ref().unwrap_or(source.document),
        base_uri: &resolved.base_uri,
        namespace: &resolved.namespace,
    };
    ctx.enter(qualified.clone());
    let result = json_type_to_avro_type(
        ctx,
        child,
        &resolved.schema,
        &type_name,
        "",
        &resolved.namespace,
        &mut Vec::new(),
        recursion_depth + 1,
    );
    ctx.leave();
    let node = result?;

    if let Some(fullname) = node.fullname() {
        if is_empty_type(&node) {
            ctx.diagnose(Diagnostic::EmptyType {
                name: fullname.clone(),
            });
        }
        ctx.registry.register(node);
        ctx.imported_types
            .insert(resolved.uri, SchemaNode::TypeRef(fullname.clone()));
        push_dependency(dependencies, &fullname);
        return Ok(SchemaNode::TypeRef(fullname));
    }

    let wrapper = compose_fullname(&resolved.namespace, &format!("{type_name}_ref"));
    if ctx.registry.contains(&wrapper) {
        // An inline shape that refers back to itself needs a name.
        let record = create_wrapper_record(&type_name, &resolved.namespace, "value", &[], node);
        ctx.registry.register(SchemaNode::Record(record));
        push_dependency(dependencies, &qualified);
        return Ok(SchemaNode::TypeRef(qualified));
    }

    ctx.imported_types.insert(resolved.uri, node.clone());
    Ok(node)
}

/// Convert an `enum` keyword. String symbols make an Avro enum; other
/// values fall back to the matching primitive.
fn enum_to_avro_type(
    json_type: &Value,
    values: &Value,
    name: &str,
    namespace: &str,
) -> Result<SchemaNode, ResolveError> {
    let Some(values) = values.as_array() else {
        return Err(ResolveError::malformed("enum", json_type));
    };
    let non_null: Vec<&Value> = values.iter().filter(|v| !v.is_null()).collect();
    let symbols: Vec<String> = non_null
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();

    let node = if non_null.is_empty() {
        return Ok(SchemaNode::null());
    } else if symbols.len() == non_null.len() {
        let mut avro_enum = create_enum_type(name, namespace, &symbols);
        merge_description_into_doc(json_type, &mut avro_enum.doc);
        SchemaNode::Enum(avro_enum)
    } else {
        primitive_for_values(values)
    };
    Ok(if non_null.len() < values.len() {
        nullable(node)
    } else {
        node
    })
}

/// Convert an array's `items`: a single schema, a tuple, or nothing at all.
#[allow(clippy::too_many_arguments)]
fn array_items_to_avro_type(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    obj: &Map<String, Value>,
    record_name: &str,
    field_name: &str,
    namespace: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<SchemaNode, ResolveError> {
    match obj.get("items") {
        Some(Value::Array(tuple)) => {
            let mut members = Vec::with_capacity(tuple.len());
            for item in tuple {
                members.push(json_type_to_avro_type(
                    ctx,
                    source,
                    item,
                    record_name,
                    field_name,
                    namespace,
                    dependencies,
                    recursion_depth + 1,
                )?);
            }
            Ok(if members.is_empty() {
                generic_type()
            } else {
                make_union(members)
            })
        }
        Some(items) => json_type_to_avro_type(
            ctx,
            source,
            items,
            record_name,
            field_name,
            namespace,
            dependencies,
            recursion_depth + 1,
        ),
        None => Ok(generic_type()),
    }
}

/// Convert `oneOf`/`anyOf`.
///
/// Without declared properties of its own, the schema becomes the union of
/// its alternatives. With properties, each alternative is merged with them:
/// immediately when every alternative is inline, or after the first pass
/// when some are `$ref`s whose targets may not exist yet.
fn alternatives_to_avro_type(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    json_type: &Value,
    name: &str,
    namespace: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<SchemaNode, ResolveError> {
    let keyword = if json_type.get("oneOf").is_some() {
        "oneOf"
    } else {
        "anyOf"
    };
    let intersect_required = keyword == "anyOf";
    let Some(branches) = json_type.get(keyword).and_then(Value::as_array) else {
        return Err(ResolveError::malformed(keyword, json_type));
    };
    let mut base = json_type.as_object().cloned().unwrap_or_default();
    base.remove(keyword);
    let base = Value::Object(base);

    if branches.is_empty() {
        return json_type_to_avro_type(
            ctx,
            source,
            &base,
            name,
            "",
            namespace,
            dependencies,
            recursion_depth + 1,
        );
    }

    if !has_properties(&base) {
        let mut members = Vec::with_capacity(branches.len());
        for (i, branch) in branches.iter().enumerate() {
            let schema = if branch.get("$ref").is_some() || is_empty_json_type(&base) {
                branch.clone()
            } else {
                merge_json_schemas(&[base.clone(), branch.clone()], intersect_required)
            };
            members.push(json_type_to_avro_type(
                ctx,
                source,
                &schema,
                &variant_name(name, branch, i),
                "",
                namespace,
                dependencies,
                recursion_depth + 1,
            )?);
        }
        return Ok(make_union(members));
    }

    if !branches.iter().any(|b| b.get("$ref").is_some()) {
        let variants = expand_composition(json_type, keyword);
        let mut members = Vec::with_capacity(variants.len());
        for (i, (variant, branch)) in variants.iter().zip(branches).enumerate() {
            members.push(json_type_to_avro_type(
                ctx,
                source,
                variant,
                &variant_name(name, branch, i),
                "",
                namespace,
                dependencies,
                recursion_depth + 1,
            )?);
        }
        return Ok(make_union(members));
    }

    let base_node = json_schema_object_to_avro_record(
        ctx,
        source,
        &base,
        name,
        namespace,
        dependencies,
        recursion_depth,
    )?;
    let SchemaNode::Record(mut record) = base_node else {
        return Ok(base_node);
    };

    let fullname = record.fullname();
    ctx.enter(fullname.clone());
    let mut converted = Vec::with_capacity(branches.len());
    let mut failure = None;
    for (i, branch) in branches.iter().enumerate() {
        match json_type_to_avro_type(
            ctx,
            source,
            branch,
            &variant_name(&record.name, branch, i),
            "",
            namespace,
            dependencies,
            recursion_depth + 1,
        ) {
            Ok(node) => converted.push(node),
            Err(err) => {
                failure = Some(err);
                break;
            }
        }
    }
    ctx.leave();
    if let Some(err) = failure {
        return Err(err);
    }

    record.unmerged = Some(UnmergedTypes {
        branches: converted,
        intersect_required,
    });
    ctx.types_with_unmerged.push(fullname);
    Ok(SchemaNode::Record(record))
}

/// Value type of the extension map built from `patternProperties` and
/// `additionalProperties`, if either admits extra keys.
fn extension_value_type(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    obj: &Map<String, Value>,
    record_name: &str,
    namespace: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<Option<SchemaNode>, ResolveError> {
    let mut value_types = Vec::new();
    if let Some(patterns) = obj.get("patternProperties").and_then(Value::as_object) {
        for prop_schema in patterns.values() {
            value_types.push(json_type_to_avro_type(
                ctx,
                source,
                prop_schema,
                record_name,
                "values",
                namespace,
                dependencies,
                recursion_depth + 1,
            )?);
        }
    }
    match obj.get("additionalProperties") {
        Some(Value::Bool(true)) => value_types.push(generic_type()),
        Some(additional @ Value::Object(_)) => value_types.push(json_type_to_avro_type(
            ctx,
            source,
            additional,
            record_name,
            "values",
            namespace,
            dependencies,
            recursion_depth + 1,
        )?),
        _ => {}
    }
    Ok(if value_types.is_empty() {
        None
    } else {
        Some(make_union(value_types))
    })
}

#[allow(clippy::too_many_arguments)]
fn convert_properties(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    properties: &Map<String, Value>,
    required: &[&str],
    record_name: &str,
    namespace: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<Vec<Field>, ResolveError> {
    let mut fields: Vec<Field> = Vec::with_capacity(properties.len());
    for (field_name, field_schema) in properties {
        let avro_field_type = json_type_to_avro_type(
            ctx,
            source,
            field_schema,
            record_name,
            field_name,
            namespace,
            dependencies,
            recursion_depth + 1,
        )?;

        let (mut avro_field_name, mut json_name) = avro_name_with_altname(field_name);
        if fields.iter().any(|f| f.name == avro_field_name) {
            let mut n = 2;
            while fields.iter().any(|f| f.name == format!("{avro_field_name}_{n}")) {
                n += 1;
            }
            avro_field_name = format!("{avro_field_name}_{n}");
            json_name = Some(field_name.clone());
        }

        let mut field = Field::new(&avro_field_name, avro_field_type);
        if let Some(json_name) = json_name {
            field.altnames.insert("json".to_string(), json_name);
        }
        merge_description_into_doc(field_schema, &mut field.doc);
        if !required.contains(&field_name.as_str()) {
            field = optional_field(field);
        }
        debug!(
            "{record_name}.{} : {}",
            field.name,
            get_field_type_name(&field)
        );
        fields.push(field);
    }
    Ok(fields)
}

/// Convert a JSON schema object declaration to an Avro record.
///
/// An object without declared properties becomes a map. Extra keys allowed
/// next to declared properties go to a sibling `<Name>_extensions` record,
/// since a record cannot carry dynamic field names.
pub fn json_schema_object_to_avro_record(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    json_object: &Value,
    name: &str,
    namespace: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<SchemaNode, ResolveError> {
    let Some(obj) = json_object.as_object() else {
        return Err(ResolveError::malformed("object", json_object));
    };

    let title = obj.get("title").and_then(Value::as_str);
    let raw_name = match (name.is_empty(), title) {
        (false, _) => name,
        (true, Some(t)) => t,
        (true, None) => "",
    };
    let record_name = avro_name(raw_name);

    let mut record_deps = Vec::new();
    let extension = extension_value_type(
        ctx,
        source,
        obj,
        &record_name,
        namespace,
        &mut record_deps,
        recursion_depth,
    )?;

    let Some(properties) = obj.get("properties").and_then(Value::as_object).filter(|p| !p.is_empty())
    else {
        dependencies.extend(record_deps);
        if let Some(values) = extension {
            return Ok(SchemaNode::map(values));
        }
        if obj.get("additionalProperties") == Some(&Value::Bool(false)) {
            let mut record = create_avro_record(&record_name, namespace, Vec::new());
            merge_description_into_doc(json_object, &mut record.doc);
            ctx.diagnose(Diagnostic::EmptyType {
                name: record.fullname(),
            });
            return Ok(SchemaNode::Record(record));
        }
        return Ok(SchemaNode::map(generic_type()));
    };

    let required: Vec<&str> = obj
        .get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let mut record = create_avro_record(&record_name, namespace, Vec::new());
    merge_description_into_doc(json_object, &mut record.doc);

    ctx.enter(record.fullname());
    let fields = convert_properties(
        ctx,
        source,
        properties,
        &required,
        &record_name,
        namespace,
        &mut record_deps,
        recursion_depth,
    );
    ctx.leave();
    record.fields = fields?;

    if let Some(values) = extension {
        let extension_record = create_wrapper_record(
            &format!("{record_name}_extensions"),
            namespace,
            "values",
            &[],
            SchemaNode::map(values),
        );
        let extension_name = extension_record.fullname();
        ctx.registry.register(SchemaNode::Record(extension_record));
        let note = format!("Additional properties are captured by {extension_name}");
        record.doc = Some(match record.doc.take() {
            Some(doc) => format!("{doc}; {note}"),
            None => note,
        });
        record_deps.push(extension_name);
    }

    for dep in &record_deps {
        record.add_dependency(dep);
        push_dependency(dependencies, dep);
    }
    Ok(SchemaNode::Record(record))
}

/// Convert a JSON Schema type into an Avro type.
///
/// Named types created here are called after `field_name` (or `record_name`
/// when there is no field) and live in `<namespace>.<record_name>_types`
/// for fields, in `namespace` otherwise.
#[allow(clippy::too_many_arguments)]
pub fn json_type_to_avro_type(
    ctx: &mut ResolutionContext<'_>,
    source: SchemaSource<'_>,
    json_type: &Value,
    record_name: &str,
    field_name: &str,
    namespace: &str,
    dependencies: &mut Vec<String>,
    recursion_depth: usize,
) -> Result<SchemaNode, ResolveError> {
    let limit = ctx.max_recursion_depth();
    if recursion_depth >= limit || ctx.record_stack.len() >= limit {
        ctx.diagnose(Diagnostic::RecursionLimitExceeded {
            record: record_name.to_string(),
            field: field_name.to_string(),
        });
        return Ok(generic_type());
    }

    let local_name = avro_name(if field_name.is_empty() {
        record_name
    } else {
        field_name
    });
    let type_namespace = if field_name.is_empty() {
        namespace.to_string()
    } else {
        nested_namespace(namespace, record_name)
    };

    let obj = match json_type {
        Value::Bool(false) => return Ok(SchemaNode::null()),
        Value::Bool(true) | Value::Null => return Ok(generic_type()),
        Value::String(s) => {
            return json_schema_primitive_to_avro_type(ctx, s, &Map::new(), dependencies)
        }
        Value::Array(list) => {
            let mut members = Vec::with_capacity(list.len());
            for item in list {
                members.push(json_type_to_avro_type(
                    ctx,
                    source,
                    item,
                    record_name,
                    field_name,
                    namespace,
                    dependencies,
                    recursion_depth + 1,
                )?);
            }
            return Ok(make_union(members));
        }
        Value::Object(obj) => obj,
        other => return Err(ResolveError::malformed("schema value", other)),
    };

    if is_empty_json_type(json_type) {
        return Ok(generic_type());
    }

    // A list of types: `["null", T]` is a nullable T, longer lists are
    // alternatives that share the rest of the schema.
    if let Some(Value::Array(type_list)) = obj.get("type") {
        let names: Vec<&str> = type_list.iter().filter_map(Value::as_str).collect();
        if names.len() != type_list.len() {
            return Err(ResolveError::malformed("type list", json_type));
        }
        let has_null = names.contains(&"null");
        let mut members = Vec::new();
        for t in names.iter().filter(|t| **t != "null") {
            let mut narrowed = obj.clone();
            narrowed.insert("type".to_string(), Value::String(t.to_string()));
            members.push(json_type_to_avro_type(
                ctx,
                source,
                &Value::Object(narrowed),
                record_name,
                field_name,
                namespace,
                dependencies,
                recursion_depth + 1,
            )?);
        }
        if members.is_empty() {
            return Ok(SchemaNode::null());
        }
        let inner = make_union(members);
        return Ok(if has_null { nullable(inner) } else { inner });
    }

    if let Some(reference) = obj.get("$ref") {
        let Some(reference) = reference.as_str() else {
            return Err(ResolveError::malformed("$ref", json_type));
        };
        return ref_to_avro_type(ctx, source, reference, dependencies, recursion_depth);
    }

    if obj.contains_key("allOf") {
        let merged = flatten_all_of(ctx, source, json_type, recursion_depth)?;
        return json_type_to_avro_type(
            ctx,
            source,
            &merged,
            record_name,
            field_name,
            namespace,
            dependencies,
            recursion_depth + 1,
        );
    }

    if obj.contains_key("oneOf") || obj.contains_key("anyOf") {
        return alternatives_to_avro_type(
            ctx,
            source,
            json_type,
            &local_name,
            &type_namespace,
            dependencies,
            recursion_depth,
        );
    }

    if let Some(values) = obj.get("enum") {
        return enum_to_avro_type(json_type, values, &local_name, &type_namespace);
    }

    if let Some(constant) = obj.get("const") {
        return Ok(match constant {
            Value::String(symbol) => {
                let mut avro_enum =
                    create_enum_type(&local_name, &type_namespace, std::slice::from_ref(symbol));
                merge_description_into_doc(json_type, &mut avro_enum.doc);
                SchemaNode::Enum(avro_enum)
            }
            Value::Null => SchemaNode::null(),
            other => primitive_for_values(std::slice::from_ref(other)),
        });
    }

    if is_array_object(json_type) {
        let items = array_items_to_avro_type(
            ctx,
            source,
            obj,
            record_name,
            field_name,
            namespace,
            dependencies,
            recursion_depth,
        )?;
        return Ok(SchemaNode::array(items));
    }

    if is_object_like(json_type) {
        return json_schema_object_to_avro_record(
            ctx,
            source,
            json_type,
            &local_name,
            &type_namespace,
            dependencies,
            recursion_depth,
        );
    }

    match obj.get("type") {
        Some(Value::String(t)) => json_schema_primitive_to_avro_type(ctx, t, obj, dependencies),
        Some(_) => Err(ResolveError::malformed("type", json_type)),
        None => Ok(generic_type()),
    }
}
