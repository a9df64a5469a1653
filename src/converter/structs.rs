use crate::avro::{split_fullname, EnumType, Field, Record, SchemaNode};
use crate::common::names::avro_name;
use crate::converter::unions::make_union;
use serde_json::Value;

/// Create an Avro record type.
pub fn create_avro_record(name: &str, namespace: &str, fields: Vec<Field>) -> Record {
    let mut record = Record::new(&avro_name(name), namespace);
    record.fields = fields;
    record
}

/// Create a wrapper record around another type.
///
/// Used when a record is required but the JSON Schema produced a primitive,
/// array or union.
pub fn create_wrapper_record(
    wrapper_name: &str,
    wrapper_namespace: &str,
    wrapper_field: &str,
    dependencies: &[String],
    avro_type: SchemaNode,
) -> Record {
    let mut record = create_avro_record(
        wrapper_name,
        wrapper_namespace,
        vec![Field::new(wrapper_field, avro_type)],
    );
    for dep in dependencies {
        record.add_dependency(dep);
    }
    record
}

/// The forwarding record that stands in for a type at the point where it
/// refers back to itself: `<Name>_ref { <Name>: <namespace.Name> }`.
pub fn create_ref_wrapper(target: &str) -> Record {
    let (namespace, name) = split_fullname(target);
    create_wrapper_record(
        &format!("{name}_ref"),
        namespace,
        name,
        &[],
        SchemaNode::TypeRef(target.to_string()),
    )
}

/// Create an Avro enum type. Symbols are sanitized and de-duplicated.
pub fn create_enum_type(name: &str, namespace: &str, symbols: &[String]) -> EnumType {
    let mut clean: Vec<String> = Vec::with_capacity(symbols.len());
    for symbol in symbols {
        let symbol = avro_name(symbol);
        if !clean.contains(&symbol) {
            clean.push(symbol);
        }
    }
    EnumType {
        name: avro_name(name),
        namespace: namespace.to_string(),
        symbols: clean,
        doc: None,
    }
}

/// Wrap a type in a union with `null`.
pub fn nullable(avro_type: SchemaNode) -> SchemaNode {
    if avro_type.is_nullable() {
        return avro_type;
    }
    make_union(vec![SchemaNode::null(), avro_type])
}

/// An optional field: `null` first in its union and a `null` default.
pub fn optional_field(mut field: Field) -> Field {
    field.field_type = make_union(vec![SchemaNode::null(), field.field_type]);
    field.default = Some(Value::Null);
    field
}
