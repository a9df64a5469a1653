use std::collections::HashMap;

use crate::avro::SchemaNode;

fn is_match(node: &SchemaNode, namespace: &str, name: &str) -> bool {
    node.name() == Some(name) && node.namespace() == Some(namespace)
}

/// Recursively search a schema for the named type `namespace.name`.
pub fn find_named<'a>(node: &'a SchemaNode, namespace: &str, name: &str) -> Option<&'a SchemaNode> {
    if is_match(node, namespace, name) {
        return Some(node);
    }
    match node {
        SchemaNode::Record(r) => r
            .fields
            .iter()
            .find_map(|f| find_named(&f.field_type, namespace, name)),
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => find_named(inner, namespace, name),
        SchemaNode::Union(members) => members.iter().find_map(|m| find_named(m, namespace, name)),
        _ => None,
    }
}

/// Visit every node of a schema, depth first, parents before children.
pub fn walk<'a, F>(node: &'a SchemaNode, visit: &mut F)
where
    F: FnMut(&'a SchemaNode),
{
    visit(node);
    match node {
        SchemaNode::Record(r) => {
            for field in &r.fields {
                walk(&field.field_type, visit);
            }
            if let Some(unmerged) = &r.unmerged {
                for branch in &unmerged.branches {
                    walk(branch, visit);
                }
            }
        }
        SchemaNode::Array(inner) | SchemaNode::Map(inner) => walk(inner, visit),
        SchemaNode::Union(members) => {
            for member in members {
                walk(member, visit);
            }
        }
        _ => {}
    }
}

/// Full names referenced through `TypeRef`s anywhere below `node`.
pub fn collect_type_refs(node: &SchemaNode) -> Vec<String> {
    let mut refs = Vec::new();
    walk(node, &mut |n| {
        if let SchemaNode::TypeRef(name) = n {
            if !refs.contains(name) {
                refs.push(name.clone());
            }
        }
    });
    refs
}

/// Full names of the named types defined inside `node` (including itself).
pub fn collect_defined_names(node: &SchemaNode) -> Vec<String> {
    let mut names = Vec::new();
    walk(node, &mut |n| {
        if let Some(fullname) = n.fullname() {
            names.push(fullname);
        }
    });
    names
}

/// Build a flat dictionary of all named types, top-level and inline.
pub fn build_flat_type_dict(types: &[SchemaNode]) -> HashMap<String, &SchemaNode> {
    let mut type_dict = HashMap::new();
    for node in types {
        walk(node, &mut |n| {
            if let Some(fullname) = n.fullname() {
                type_dict.entry(fullname).or_insert(n);
            }
        });
    }
    type_dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{Field, Record};

    fn nested() -> SchemaNode {
        let mut inner = Record::new("Inner", "ns.Outer_types");
        inner
            .fields
            .push(Field::new("next", SchemaNode::TypeRef("ns.Other".into())));
        let mut outer = Record::new("Outer", "ns");
        outer.fields.push(Field::new(
            "items",
            SchemaNode::array(SchemaNode::Union(vec![
                SchemaNode::null(),
                SchemaNode::Record(inner),
            ])),
        ));
        SchemaNode::Record(outer)
    }

    #[test]
    fn test_find_named_descends_into_containers() {
        let schema = nested();
        assert!(find_named(&schema, "ns.Outer_types", "Inner").is_some());
        assert!(find_named(&schema, "ns", "Inner").is_none());
    }

    #[test]
    fn test_collect_refs_and_names() {
        let schema = nested();
        assert_eq!(collect_type_refs(&schema), vec!["ns.Other".to_string()]);
        assert_eq!(
            collect_defined_names(&schema),
            vec!["ns.Outer".to_string(), "ns.Outer_types.Inner".to_string()]
        );
        assert_eq!(build_flat_type_dict(&[schema]).len(), 2);
    }
}
