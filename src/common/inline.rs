use std::collections::{HashMap, HashSet};

use crate::avro::SchemaNode;

/// Inline the first reference to each named type and refer to later uses by name.
///
/// `defined` tracks the full names already written out. A named node that was
/// already defined earlier in the output is evicted in favor of a `TypeRef`,
/// so the result is a valid standalone Avro schema.
pub fn inline_avro_references(
    node: &SchemaNode,
    type_dict: &HashMap<String, &SchemaNode>,
    defined: &mut HashSet<String>,
) -> SchemaNode {
    match node {
        SchemaNode::TypeRef(name) => {
            if defined.contains(name) {
                return node.clone();
            }
            match type_dict.get(name) {
                Some(definition) => inline_avro_references(definition, type_dict, defined),
                None => node.clone(),
            }
        }
        SchemaNode::Record(r) => {
            let fullname = r.fullname();
            if !defined.insert(fullname.clone()) {
                return SchemaNode::TypeRef(fullname);
            }
            let mut record = r.clone();
            for field in &mut record.fields {
                field.field_type = inline_avro_references(&field.field_type, type_dict, defined);
            }
            SchemaNode::Record(record)
        }
        SchemaNode::Enum(_) | SchemaNode::Fixed(_) => {
            let fullname = node.fullname().unwrap_or_default();
            if !defined.insert(fullname.clone()) {
                return SchemaNode::TypeRef(fullname);
            }
            node.clone()
        }
        SchemaNode::Array(items) => {
            SchemaNode::array(inline_avro_references(items, type_dict, defined))
        }
        SchemaNode::Map(values) => {
            SchemaNode::map(inline_avro_references(values, type_dict, defined))
        }
        SchemaNode::Union(members) => SchemaNode::Union(
            members
                .iter()
                .map(|m| inline_avro_references(m, type_dict, defined))
                .collect(),
        ),
        SchemaNode::Primitive(_) => node.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{Field, Record};
    use crate::common::traversal::build_flat_type_dict;

    #[test]
    fn test_recursive_reference_terminates() {
        let mut node = Record::new("Node", "ns");
        node.fields.push(Field::new(
            "next",
            SchemaNode::Union(vec![SchemaNode::null(), SchemaNode::TypeRef("ns.Node".into())]),
        ));
        let types = vec![SchemaNode::Record(node)];
        let dict = build_flat_type_dict(&types);
        let mut defined = HashSet::new();
        let inlined =
            inline_avro_references(&SchemaNode::TypeRef("ns.Node".into()), &dict, &mut defined);
        let record = inlined.as_record().unwrap();
        assert_eq!(
            record.fields[0].field_type,
            SchemaNode::Union(vec![SchemaNode::null(), SchemaNode::TypeRef("ns.Node".into())])
        );
    }
}
