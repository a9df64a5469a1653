//! Avro-like intermediate representation shared by the resolver, the
//! inferrer, the canonicalizer and downstream emitters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeMap;

pub mod json;
pub mod registry;

pub use registry::{Diagnostic, SchemaRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PrimitiveKind {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 8] = [
        PrimitiveKind::Null,
        PrimitiveKind::Boolean,
        PrimitiveKind::Int,
        PrimitiveKind::Long,
        PrimitiveKind::Float,
        PrimitiveKind::Double,
        PrimitiveKind::Bytes,
        PrimitiveKind::String,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveKind::Null => "null",
            PrimitiveKind::Boolean => "boolean",
            PrimitiveKind::Int => "int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::Bytes => "bytes",
            PrimitiveKind::String => "string",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        PrimitiveKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Date,
    TimeMillis,
    TimestampMillis,
    Decimal { precision: u32, scale: u32 },
    Uuid,
    Duration,
}

impl LogicalType {
    pub fn name(&self) -> &'static str {
        match self {
            LogicalType::Date => "date",
            LogicalType::TimeMillis => "time-millis",
            LogicalType::TimestampMillis => "timestamp-millis",
            LogicalType::Decimal { .. } => "decimal",
            LogicalType::Uuid => "uuid",
            LogicalType::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub kind: PrimitiveKind,
    pub logical_type: Option<LogicalType>,
}

impl Primitive {
    pub fn new(kind: PrimitiveKind) -> Self {
        Self {
            kind,
            logical_type: None,
        }
    }

    pub fn with_logical_type(kind: PrimitiveKind, logical_type: LogicalType) -> Self {
        Self {
            kind,
            logical_type: Some(logical_type),
        }
    }
}

/// `oneOf`/`anyOf` branches whose merge into the owning record is deferred
/// until every type of the conversion exists.
#[derive(Debug, Clone, PartialEq)]
pub struct UnmergedTypes {
    pub branches: Vec<SchemaNode>,
    /// `anyOf` semantics: a field stays required only if every side requires it.
    pub intersect_required: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub name: String,
    pub namespace: String,
    pub fields: Vec<Field>,
    pub doc: Option<String>,
    /// Full names of the named types this record refers to.
    pub dependencies: Vec<String>,
    pub unmerged: Option<UnmergedTypes>,
}

impl Record {
    pub fn new(name: &str, namespace: &str) -> Self {
        Self {
            name: name.to_string(),
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn fullname(&self) -> String {
        compose_fullname(&self.namespace, &self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn add_dependency(&mut self, dependency: &str) {
        if dependency != self.fullname() && !self.dependencies.iter().any(|d| d == dependency) {
            self.dependencies.push(dependency.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnumType {
    pub name: String,
    pub namespace: String,
    pub symbols: Vec<String>,
    pub doc: Option<String>,
}

impl EnumType {
    pub fn fullname(&self) -> String {
        compose_fullname(&self.namespace, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fixed {
    pub name: String,
    pub namespace: String,
    pub size: usize,
    pub logical_type: Option<LogicalType>,
}

impl Fixed {
    pub fn fullname(&self) -> String {
        compose_fullname(&self.namespace, &self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: SchemaNode,
    pub doc: Option<String>,
    pub default: Option<Value>,
    /// Alternate names keyed by purpose, e.g. `json` for the source property name.
    pub altnames: BTreeMap<String, String>,
}

impl Field {
    pub fn new(name: &str, field_type: SchemaNode) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            doc: None,
            default: None,
            altnames: BTreeMap::new(),
        }
    }

    /// The key this field is stored under in a JSON document.
    pub fn json_name(&self) -> &str {
        self.altnames
            .get("json")
            .map(String::as_str)
            .unwrap_or(&self.name)
    }
}

/// One node of the schema graph.
///
/// `TypeRef` is a lookup by full name into a [`SchemaRegistry`] and never owns
/// its referent, so recursive types need no shared ownership.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaNode {
    Primitive(Primitive),
    Record(Record),
    Enum(EnumType),
    Fixed(Fixed),
    Array(Box<SchemaNode>),
    Map(Box<SchemaNode>),
    Union(Vec<SchemaNode>),
    TypeRef(String),
}

impl SchemaNode {
    pub fn primitive(kind: PrimitiveKind) -> Self {
        SchemaNode::Primitive(Primitive::new(kind))
    }

    pub fn null() -> Self {
        Self::primitive(PrimitiveKind::Null)
    }

    pub fn string() -> Self {
        Self::primitive(PrimitiveKind::String)
    }

    pub fn array(items: SchemaNode) -> Self {
        SchemaNode::Array(Box::new(items))
    }

    pub fn map(values: SchemaNode) -> Self {
        SchemaNode::Map(Box::new(values))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, SchemaNode::Primitive(p) if p.kind == PrimitiveKind::Null)
    }

    /// True for `null` itself and for unions with a `null` member.
    pub fn is_nullable(&self) -> bool {
        match self {
            SchemaNode::Union(members) => members.iter().any(SchemaNode::is_null),
            other => other.is_null(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            SchemaNode::Record(r) => Some(&r.name),
            SchemaNode::Enum(e) => Some(&e.name),
            SchemaNode::Fixed(f) => Some(&f.name),
            _ => None,
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            SchemaNode::Record(r) => Some(&r.namespace),
            SchemaNode::Enum(e) => Some(&e.namespace),
            SchemaNode::Fixed(f) => Some(&f.namespace),
            _ => None,
        }
    }

    pub fn fullname(&self) -> Option<String> {
        match self {
            SchemaNode::Record(r) => Some(r.fullname()),
            SchemaNode::Enum(e) => Some(e.fullname()),
            SchemaNode::Fixed(f) => Some(f.fullname()),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            SchemaNode::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Short label of the node kind, used in logs and errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            SchemaNode::Primitive(p) => p.kind.as_str(),
            SchemaNode::Record(_) => "record",
            SchemaNode::Enum(_) => "enum",
            SchemaNode::Fixed(_) => "fixed",
            SchemaNode::Array(_) => "array",
            SchemaNode::Map(_) => "map",
            SchemaNode::Union(_) => "union",
            SchemaNode::TypeRef(_) => "reference",
        }
    }
}

impl From<PrimitiveKind> for SchemaNode {
    fn from(kind: PrimitiveKind) -> Self {
        SchemaNode::primitive(kind)
    }
}

impl Serialize for SchemaNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        json::to_value(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SchemaNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        json::from_value(&value, "").map_err(serde::de::Error::custom)
    }
}

/// Join a namespace and a name; an empty namespace yields the bare name.
pub fn compose_fullname(namespace: &str, name: &str) -> String {
    if namespace.is_empty() || name.contains('.') {
        name.to_string()
    } else {
        format!("{namespace}.{name}")
    }
}

/// Split a full name into `(namespace, name)`.
pub fn split_fullname(fullname: &str) -> (&str, &str) {
    match fullname.rsplit_once('.') {
        Some((namespace, name)) => (namespace, name),
        None => ("", fullname),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullname_composition() {
        assert_eq!(compose_fullname("", "Foo"), "Foo");
        assert_eq!(compose_fullname("a.b", "Foo"), "a.b.Foo");
        assert_eq!(compose_fullname("a.b", "x.Foo"), "x.Foo");
        assert_eq!(split_fullname("a.b.Foo"), ("a.b", "Foo"));
        assert_eq!(split_fullname("Foo"), ("", "Foo"));
    }

    #[test]
    fn test_nullability() {
        let union = SchemaNode::Union(vec![SchemaNode::null(), SchemaNode::string()]);
        assert!(union.is_nullable());
        assert!(!SchemaNode::string().is_nullable());
        assert!(SchemaNode::null().is_nullable());
    }

    #[test]
    fn test_dependency_skips_self() {
        let mut record = Record::new("Node", "ns");
        record.add_dependency("ns.Node");
        record.add_dependency("ns.Other");
        record.add_dependency("ns.Other");
        assert_eq!(record.dependencies, vec!["ns.Other".to_string()]);
    }
}
