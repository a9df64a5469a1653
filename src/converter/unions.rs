use crate::avro::SchemaNode;

/// Flatten a union type into a simplified list of unique types.
///
/// This will:
/// - expand nested unions,
/// - remove duplicates, and named types sharing a full name,
/// - put `null` first, at most once,
/// - merge multiple `array` or `map` members into one whose items/values
///   are the union of theirs.
pub fn flatten_union(type_list: Vec<SchemaNode>) -> Vec<SchemaNode> {
    let mut flat_list: Vec<SchemaNode> = Vec::new();
    let mut has_null = false;
    expand(type_list, &mut flat_list, &mut has_null);

    let mut array_items: Option<Vec<SchemaNode>> = None;
    let mut map_values: Option<Vec<SchemaNode>> = None;
    let mut array_slot = None;
    let mut map_slot = None;
    let mut result: Vec<SchemaNode> = Vec::with_capacity(flat_list.len() + 1);

    for t in flat_list {
        match t {
            SchemaNode::Array(items) => {
                array_items.get_or_insert_with(Vec::new).push(*items);
                if array_slot.is_none() {
                    array_slot = Some(result.len());
                    result.push(SchemaNode::null());
                }
            }
            SchemaNode::Map(values) => {
                map_values.get_or_insert_with(Vec::new).push(*values);
                if map_slot.is_none() {
                    map_slot = Some(result.len());
                    result.push(SchemaNode::null());
                }
            }
            other => result.push(other),
        }
    }
    if let (Some(slot), Some(items)) = (array_slot, array_items) {
        result[slot] = SchemaNode::array(make_union(items));
    }
    if let (Some(slot), Some(values)) = (map_slot, map_values) {
        result[slot] = SchemaNode::map(make_union(values));
    }

    if has_null {
        result.insert(0, SchemaNode::null());
    }
    result
}

fn expand(type_list: Vec<SchemaNode>, out: &mut Vec<SchemaNode>, has_null: &mut bool) {
    for t in type_list {
        match t {
            SchemaNode::Union(members) => expand(members, out, has_null),
            t if t.is_null() => *has_null = true,
            t => {
                let duplicate = match t.fullname() {
                    Some(fullname) => out
                        .iter()
                        .any(|u| u.fullname().as_deref() == Some(fullname.as_str())),
                    None => out.contains(&t),
                };
                if !duplicate {
                    out.push(t);
                }
            }
        }
    }
}

/// Flatten `members` and collapse a single-member result to that member.
pub fn make_union(members: Vec<SchemaNode>) -> SchemaNode {
    let mut flat = flatten_union(members);
    if flat.len() == 1 {
        flat.remove(0)
    } else {
        SchemaNode::Union(flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::avro::{PrimitiveKind, Record};

    fn named(name: &str) -> SchemaNode {
        SchemaNode::Record(Record::new(name, "ns"))
    }

    #[test]
    fn test_member_order_does_not_change_the_set() {
        let ab = flatten_union(vec![named("A"), named("B")]);
        let ba = flatten_union(vec![named("B"), named("A")]);
        assert_eq!(ab.len(), 2);
        assert!(ab.iter().all(|m| ba.contains(m)));
        assert!(ba.iter().all(|m| ab.contains(m)));
    }

    #[test]
    fn test_nested_unions_and_nulls() {
        let flat = flatten_union(vec![
            SchemaNode::string(),
            SchemaNode::Union(vec![SchemaNode::null(), SchemaNode::string()]),
            SchemaNode::null(),
        ]);
        assert_eq!(flat, vec![SchemaNode::null(), SchemaNode::string()]);
    }

    #[test]
    fn test_arrays_are_merged() {
        let flat = flatten_union(vec![
            SchemaNode::array(SchemaNode::string()),
            PrimitiveKind::Long.into(),
            SchemaNode::array(PrimitiveKind::Long.into()),
        ]);
        assert_eq!(
            flat,
            vec![
                SchemaNode::array(SchemaNode::Union(vec![
                    SchemaNode::string(),
                    PrimitiveKind::Long.into()
                ])),
                PrimitiveKind::Long.into(),
            ]
        );
    }

    #[test]
    fn test_make_union_collapses_single_member() {
        assert_eq!(
            make_union(vec![SchemaNode::string(), SchemaNode::string()]),
            SchemaNode::string()
        );
    }
}
