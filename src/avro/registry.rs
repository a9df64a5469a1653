use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

use super::{json, split_fullname, SchemaNode};
use crate::common::inline::inline_avro_references;
use crate::common::traversal::{build_flat_type_dict, find_named};
use crate::dependency_resolver::sort_by_dependencies;

/// A warning raised during a conversion that did not stop output generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Diagnostic {
    UnresolvableReference { reference: String, message: String },
    RecursionLimitExceeded { record: String, field: String },
    EmptyType { name: String },
    UnbrokenCycle { names: Vec<String> },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnresolvableReference { reference, message } => {
                write!(f, "could not resolve {reference}: {message}")
            }
            Diagnostic::RecursionLimitExceeded { record, field } => {
                write!(f, "maximum recursion depth reached for {record} at field {field}")
            }
            Diagnostic::EmptyType { name } => write!(f, "generated type {name} is empty"),
            Diagnostic::UnbrokenCycle { names } => {
                write!(f, "dependency cycle could not be ordered: {}", names.join(", "))
            }
        }
    }
}

/// Ordered set of top-level named types produced by one conversion.
///
/// No two entries share a full name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: Vec<SchemaNode>,
    root: Option<String>,
    diagnostics: Vec<Diagnostic>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a named type unless one with the same full name exists.
    ///
    /// Returns true if the type is present afterwards.
    pub fn register(&mut self, node: SchemaNode) -> bool {
        let Some(fullname) = node.fullname() else {
            return false;
        };
        if !self.contains(&fullname) {
            self.types.push(node);
        }
        true
    }

    pub fn contains(&self, fullname: &str) -> bool {
        self.position(fullname).is_some()
    }

    pub fn position(&self, fullname: &str) -> Option<usize> {
        self.types
            .iter()
            .position(|t| t.fullname().as_deref() == Some(fullname))
    }

    /// Look up a named type, including types defined inline inside other entries.
    pub fn get(&self, fullname: &str) -> Option<&SchemaNode> {
        if let Some(idx) = self.position(fullname) {
            return self.types.get(idx);
        }
        let (namespace, name) = split_fullname(fullname);
        self.types
            .iter()
            .find_map(|t| find_named(t, namespace, name))
    }

    pub fn replace(&mut self, fullname: &str, node: SchemaNode) -> bool {
        match self.position(fullname) {
            Some(idx) => {
                self.types[idx] = node;
                true
            }
            None => false,
        }
    }

    pub fn types(&self) -> &[SchemaNode] {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut Vec<SchemaNode> {
        &mut self.types
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SchemaNode> {
        self.types.iter()
    }

    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn set_root(&mut self, fullname: Option<String>) {
        self.root = fullname;
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn push_diagnostic(&mut self, diagnostic: Diagnostic) {
        if !self.diagnostics.contains(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    /// Reorder entries so every type follows the types it depends on.
    pub fn sort_by_dependencies(&mut self) {
        let types = std::mem::take(&mut self.types);
        let (sorted, cycles) = sort_by_dependencies(types);
        self.types = sorted;
        for names in cycles {
            self.push_diagnostic(Diagnostic::UnbrokenCycle { names });
        }
    }

    /// The registry as a JSON array of Avro schemas.
    pub fn to_json(&self) -> Value {
        Value::Array(self.types.iter().map(json::to_value).collect())
    }

    /// A single self-contained schema for `root`: the first use of each named
    /// type carries its definition, later uses refer to it by name.
    pub fn to_inlined_json(&self, root: &str) -> Option<Value> {
        let root_node = self.get(root)?;
        let type_dict = build_flat_type_dict(&self.types);
        let mut defined = HashSet::new();
        let inlined = inline_avro_references(root_node, &type_dict, &mut defined);
        Some(json::to_value(&inlined))
    }
}

impl<'a> IntoIterator for &'a SchemaRegistry {
    type Item = &'a SchemaNode;
    type IntoIter = std::slice::Iter<'a, SchemaNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.types.iter()
    }
}
