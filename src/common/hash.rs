use serde_json::Value;
use std::collections::HashSet;
use xxhash_rust::xxh64::xxh64;

use crate::avro::{LogicalType, SchemaNode};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHash {
    pub hash_value: u64,
    pub count: usize,
}

/// Generate a hash from a JSON value (object, array, or primitive) using xxh64.
///
/// `count` is the length of the serialized form.
pub fn get_tree_hash(json_obj: &Value) -> NodeHash {
    let json_str = json_obj.to_string();
    NodeHash {
        hash_value: xxh64(json_str.as_bytes(), 0),
        count: json_str.len(),
    }
}

/// Content-addressed hash of a node's shape.
///
/// Record fields are hashed in name order so two records that differ only in
/// field order hash equally; docs, defaults and bookkeeping are ignored.
pub fn structural_hash(node: &SchemaNode) -> u64 {
    let mut shape = String::new();
    write_shape(node, &mut shape);
    xxh64(shape.as_bytes(), 0)
}

fn write_shape(node: &SchemaNode, out: &mut String) {
    match node {
        SchemaNode::Primitive(p) => {
            out.push_str(p.kind.as_str());
            if let Some(lt) = &p.logical_type {
                out.push(':');
                write_logical(lt, out);
            }
        }
        SchemaNode::Record(r) => {
            out.push_str("record ");
            out.push_str(&r.fullname());
            out.push('{');
            let mut fields: Vec<_> = r.fields.iter().collect();
            fields.sort_by(|a, b| a.name.cmp(&b.name));
            for field in fields {
                out.push_str(&field.name);
                out.push(':');
                write_shape(&field.field_type, out);
                out.push(';');
            }
            out.push('}');
        }
        SchemaNode::Enum(e) => {
            out.push_str("enum ");
            out.push_str(&e.fullname());
            out.push('{');
            out.push_str(&e.symbols.join(","));
            out.push('}');
        }
        SchemaNode::Fixed(f) => {
            out.push_str(&format!("fixed {}[{}]", f.fullname(), f.size));
        }
        SchemaNode::Array(items) => {
            out.push_str("array<");
            write_shape(items, out);
            out.push('>');
        }
        SchemaNode::Map(values) => {
            out.push_str("map<");
            write_shape(values, out);
            out.push('>');
        }
        SchemaNode::Union(members) => {
            let mut parts: Vec<String> = members
                .iter()
                .map(|m| {
                    let mut s = String::new();
                    write_shape(m, &mut s);
                    s
                })
                .collect();
            parts.sort();
            out.push('(');
            out.push_str(&parts.join("|"));
            out.push(')');
        }
        SchemaNode::TypeRef(name) => {
            out.push('&');
            out.push_str(name);
        }
    }
}

fn write_logical(lt: &LogicalType, out: &mut String) {
    match lt {
        LogicalType::Decimal { precision, scale } => {
            out.push_str(&format!("decimal({precision},{scale})"))
        }
        other => out.push_str(other.name()),
    }
}

/// Drop nodes whose structural hash was already seen, keeping first occurrences.
pub fn dedupe_by_shape(nodes: Vec<SchemaNode>) -> Vec<SchemaNode> {
    let mut seen = HashSet::new();
    nodes
        .into_iter()
        .filter(|node| seen.insert(structural_hash(node)))
        .collect()
}
