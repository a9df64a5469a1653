use serde_json::Value;

use crate::avro::{Field, PrimitiveKind, Record, SchemaNode};
use crate::common::hash::dedupe_by_shape;
use crate::converter::unions::make_union;

/// Fold inferred types observed in the same slot into one type.
///
/// Records sharing a full name are folded field by field, arrays and maps
/// fold their items and values, `long` next to `double` widens to
/// `double`, and everything else becomes a flattened union. No candidates
/// at all yields the empty union, the marker for "nothing observed".
pub fn fold_types(candidates: Vec<SchemaNode>) -> SchemaNode {
    let mut members: Vec<SchemaNode> = Vec::new();
    for candidate in dedupe_by_shape(candidates) {
        absorb(&mut members, candidate);
    }

    let plain = |kind: PrimitiveKind| SchemaNode::primitive(kind);
    if members.contains(&plain(PrimitiveKind::Double)) {
        members.retain(|m| *m != plain(PrimitiveKind::Long));
    }
    make_union(members)
}

fn absorb(members: &mut Vec<SchemaNode>, node: SchemaNode) {
    match node {
        SchemaNode::Union(inner) => {
            for member in inner {
                absorb(members, member);
            }
        }
        SchemaNode::Record(record) => {
            let fullname = record.fullname();
            let slot = members
                .iter()
                .position(|m| matches!(m, SchemaNode::Record(r) if r.fullname() == fullname));
            match slot {
                Some(i) => {
                    if let SchemaNode::Record(existing) = &mut members[i] {
                        fold_records(existing, &record);
                    }
                }
                None => members.push(SchemaNode::Record(record)),
            }
        }
        SchemaNode::Array(items) => {
            match members.iter().position(|m| matches!(m, SchemaNode::Array(_))) {
                Some(i) => {
                    if let SchemaNode::Array(existing) = &mut members[i] {
                        let previous = std::mem::replace(existing.as_mut(), SchemaNode::null());
                        **existing = fold_types(vec![previous, *items]);
                    }
                }
                None => members.push(SchemaNode::Array(items)),
            }
        }
        SchemaNode::Map(values) => {
            match members.iter().position(|m| matches!(m, SchemaNode::Map(_))) {
                Some(i) => {
                    if let SchemaNode::Map(existing) = &mut members[i] {
                        let previous = std::mem::replace(existing.as_mut(), SchemaNode::null());
                        **existing = fold_types(vec![previous, *values]);
                    }
                }
                None => members.push(SchemaNode::Map(values)),
            }
        }
        other => {
            if !members.contains(&other) {
                members.push(other);
            }
        }
    }
}

/// Nullable fields default to `null`.
pub fn settle_default(field: &mut Field) {
    if field.field_type.is_nullable() && field.default.is_none() {
        field.default = Some(Value::Null);
    }
}

fn make_optional(mut field: Field) -> Field {
    field.field_type = make_union(vec![SchemaNode::null(), field.field_type]);
    settle_default(&mut field);
    field
}

/// Fold `incoming` into `existing`.
///
/// Fields are matched by their JSON name. A field missing on either side
/// becomes nullable with a `null` default; differing types are folded.
pub fn fold_records(existing: &mut Record, incoming: &Record) {
    let fields = std::mem::take(&mut existing.fields);
    for field in fields {
        let next = match incoming.fields.iter().find(|f| f.json_name() == field.json_name()) {
            Some(other) => {
                let mut folded = field.clone();
                folded.field_type = fold_types(vec![field.field_type, other.field_type.clone()]);
                if folded.doc.is_none() {
                    folded.doc = other.doc.clone();
                }
                settle_default(&mut folded);
                folded
            }
            None => make_optional(field),
        };
        existing.fields.push(next);
    }
    for field in &incoming.fields {
        if !existing.fields.iter().any(|f| f.json_name() == field.json_name()) {
            existing.fields.push(make_optional(field.clone()));
        }
    }
    if existing.doc.is_none() {
        existing.doc = incoming.doc.clone();
    }
}

/// Replace the "nothing observed" marker left by empty arrays with `string`.
pub fn settle_unknown(node: SchemaNode) -> SchemaNode {
    match node {
        SchemaNode::Union(members) if members.is_empty() => SchemaNode::string(),
        SchemaNode::Union(members) => {
            make_union(members.into_iter().map(settle_unknown).collect())
        }
        SchemaNode::Array(items) => SchemaNode::array(settle_unknown(*items)),
        SchemaNode::Map(values) => SchemaNode::map(settle_unknown(*values)),
        SchemaNode::Record(mut record) => {
            for field in &mut record.fields {
                let field_type = std::mem::replace(&mut field.field_type, SchemaNode::null());
                field.field_type = settle_unknown(field_type);
            }
            SchemaNode::Record(record)
        }
        other => other,
    }
}
