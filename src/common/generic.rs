use crate::avro::{PrimitiveKind, SchemaNode};

fn simple_type_union() -> Vec<SchemaNode> {
    PrimitiveKind::ALL.iter().map(|k| SchemaNode::primitive(*k)).collect()
}

/// Construct a generic Avro type union (simple types + arrays + maps).
///
/// Stands in for schemas that accept any JSON value and for subtrees cut off
/// by the recursion guard.
pub fn generic_type() -> SchemaNode {
    let simple = simple_type_union();

    let mut l2 = simple.clone();
    l2.push(SchemaNode::array(SchemaNode::Union(simple.clone())));
    l2.push(SchemaNode::map(SchemaNode::Union(simple.clone())));

    let mut l1 = simple;
    l1.push(SchemaNode::array(SchemaNode::Union(l2.clone())));
    l1.push(SchemaNode::map(SchemaNode::Union(l2)));

    SchemaNode::Union(l1)
}
