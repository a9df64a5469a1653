use std::collections::HashSet;
use tracing::warn;

use crate::avro::SchemaNode;
use crate::common::traversal::{collect_defined_names, collect_type_refs};
use crate::converter::analysis::is_cycle_wrapper;

/// Names a top-level type must follow in the output order.
///
/// Declared record dependencies and every `TypeRef` in the subtree count;
/// the type itself, the types it defines inline, and the back-edge of a
/// `*_ref` cycle wrapper do not.
pub fn ordering_dependencies(node: &SchemaNode) -> Vec<String> {
    if let SchemaNode::Record(r) = node {
        if is_cycle_wrapper(r) {
            return Vec::new();
        }
    }
    let defined: HashSet<String> = collect_defined_names(node).into_iter().collect();
    let mut deps: Vec<String> = Vec::new();
    let declared = match node {
        SchemaNode::Record(r) => r.dependencies.clone(),
        _ => Vec::new(),
    };
    for dep in declared.into_iter().chain(collect_type_refs(node)) {
        if !defined.contains(&dep) && !deps.contains(&dep) {
            deps.push(dep);
        }
    }
    deps
}

/// Sort types so that dependencies precede their dependents.
///
/// Ties keep discovery order. Dependencies on names outside the list are
/// ignored. When only cyclic types remain, the earliest one is emitted anyway
/// and the names involved are reported as the second tuple element.
pub fn sort_by_dependencies(mut types: Vec<SchemaNode>) -> (Vec<SchemaNode>, Vec<Vec<String>>) {
    let known: HashSet<String> = types.iter().filter_map(SchemaNode::fullname).collect();
    let mut emitted: HashSet<String> = HashSet::new();
    let mut sorted: Vec<SchemaNode> = Vec::with_capacity(types.len());
    let mut cycles: Vec<Vec<String>> = Vec::new();

    while !types.is_empty() {
        let mut found = false;
        let mut i = 0;
        while i < types.len() {
            let ready = ordering_dependencies(&types[i])
                .iter()
                .all(|d| emitted.contains(d) || !known.contains(d));
            if ready {
                let node = types.remove(i);
                emitted.extend(collect_defined_names(&node));
                sorted.push(node);
                found = true;
                continue;
            }
            i += 1;
        }

        if !found {
            let names: Vec<String> = types.iter().filter_map(SchemaNode::fullname).collect();
            warn!("Circular dependencies remain unresolved: {}", names.join(", "));
            let node = types.remove(0);
            emitted.extend(collect_defined_names(&node));
            sorted.push(node);
            cycles.push(names);
        }
    }

    (sorted, cycles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{Field, Record};

    fn record(name: &str, refs: &[&str]) -> SchemaNode {
        let mut r = Record::new(name, "ns");
        for target in refs {
            r.fields.push(Field::new(
                &target.to_lowercase(),
                SchemaNode::TypeRef(format!("ns.{target}")),
            ));
            r.add_dependency(&format!("ns.{target}"));
        }
        SchemaNode::Record(r)
    }

    fn names(types: &[SchemaNode]) -> Vec<String> {
        types.iter().map(|t| t.name().unwrap().to_string()).collect()
    }

    #[test]
    fn test_dependencies_come_first() {
        let (sorted, cycles) =
            sort_by_dependencies(vec![record("A", &["B"]), record("B", &["C"]), record("C", &[])]);
        assert_eq!(names(&sorted), vec!["C", "B", "A"]);
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_ties_keep_discovery_order() {
        let (sorted, _) =
            sort_by_dependencies(vec![record("X", &[]), record("A", &["Y"]), record("Y", &[])]);
        assert_eq!(names(&sorted), vec!["X", "Y", "A"]);
    }

    #[test]
    fn test_cycle_wrapper_is_exempt() {
        let mut wrapper = Record::new("Node_ref", "ns");
        wrapper
            .fields
            .push(Field::new("Node", SchemaNode::TypeRef("ns.Node".into())));
        let (sorted, cycles) = sort_by_dependencies(vec![
            record("Node", &["Node_ref"]),
            SchemaNode::Record(wrapper),
        ]);
        assert_eq!(names(&sorted), vec!["Node_ref", "Node"]);
        assert!(cycles.is_empty());
    }

    #[test]
    fn test_true_cycle_is_reported() {
        let (sorted, cycles) = sort_by_dependencies(vec![record("A", &["B"]), record("B", &["A"])]);
        assert_eq!(sorted.len(), 2);
        assert_eq!(cycles.len(), 1);
    }
}
