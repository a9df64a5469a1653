use serde_json::Value;

use crate::avro::{Field, Record, SchemaNode};
use crate::converter::structs::optional_field;
use crate::converter::unions::make_union;

/// Merge multiple Avro types into one.
///
/// Equal types and named types with the same full name collapse; anything
/// else becomes a flattened union.
pub fn merge_avro_schemas(schemas: &[SchemaNode]) -> SchemaNode {
    match schemas {
        [] => SchemaNode::null(),
        [single] => single.clone(),
        _ => make_union(schemas.to_vec()),
    }
}

fn merge_fields(existing: &Field, incoming: &Field) -> Field {
    let mut field = existing.clone();
    field.field_type = merge_avro_schemas(&[existing.field_type.clone(), incoming.field_type.clone()]);
    if field.doc.is_none() {
        field.doc = incoming.doc.clone();
    }
    for (purpose, alt) in &incoming.altnames {
        field.altnames.entry(purpose.clone()).or_insert_with(|| alt.clone());
    }
    let null_first = match &field.field_type {
        SchemaNode::Union(members) => members.first().is_some_and(SchemaNode::is_null),
        other => other.is_null(),
    };
    if null_first && field.default.is_none() {
        field.default = Some(Value::Null);
    }
    field
}

/// Merge the fields of an alternative into the record that declares it.
///
/// Fields present on both sides have their types unioned. With
/// `intersect_required`, a field only one side declares becomes optional.
pub fn merge_avro_records(
    base: &Record,
    branch: &Record,
    name: &str,
    intersect_required: bool,
) -> Record {
    let mut merged = Record::new(name, &base.namespace);
    merged.doc = base.doc.clone().or_else(|| branch.doc.clone());

    for field in &base.fields {
        let next = match branch.field(&field.name) {
            Some(other) => merge_fields(field, other),
            None if intersect_required => optional_field(field.clone()),
            None => field.clone(),
        };
        merged.fields.push(next);
    }
    for field in &branch.fields {
        if base.field(&field.name).is_some() {
            continue;
        }
        merged.fields.push(if intersect_required {
            optional_field(field.clone())
        } else {
            field.clone()
        });
    }

    for dep in base.dependencies.iter().chain(&branch.dependencies) {
        merged.add_dependency(dep);
    }
    merged
}
