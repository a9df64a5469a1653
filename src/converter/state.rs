use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use tracing::warn;

use crate::avro::{compose_fullname, split_fullname, Diagnostic, SchemaNode, SchemaRegistry};
use crate::converter::structs::create_ref_wrapper;

/// Options for one JSON Schema → Avro conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConverterConfig {
    /// Namespace of the generated types. Left empty, the file-level driver
    /// derives it from `$id` or the file name.
    pub namespace: String,
    /// Namespace for shared helper types; defaults to `<namespace>.utility`.
    pub utility_namespace: Option<String>,
    /// Name of the record generated for the document root.
    pub root_class_name: String,
    pub max_recursion_depth: usize,
    pub split_top_level_records: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            utility_namespace: None,
            root_class_name: "document".to_string(),
            max_recursion_depth: 40,
            split_top_level_records: false,
        }
    }
}

impl ConverterConfig {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn with_utility_namespace(mut self, utility_namespace: &str) -> Self {
        self.utility_namespace = Some(utility_namespace.to_string());
        self
    }

    pub fn with_root_class_name(mut self, root_class_name: &str) -> Self {
        self.root_class_name = root_class_name.to_string();
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    pub fn with_split_top_level_records(mut self, split: bool) -> Self {
        self.split_top_level_records = split;
        self
    }

    pub fn effective_utility_namespace(&self) -> String {
        match &self.utility_namespace {
            Some(ns) if !ns.is_empty() => ns.clone(),
            _ if self.namespace.is_empty() => "utility".to_string(),
            _ => format!("{}.utility", self.namespace),
        }
    }
}

/// The document a schema fragment was read from.
///
/// `namespace` is the namespace the document's own definitions live in; it
/// changes when a `$ref` crosses into a document with a different `$id`.
#[derive(Debug, Clone, Copy)]
pub struct SchemaSource<'a> {
    pub document: &'a Value,
    pub base_uri: &'a str,
    pub namespace: &'a str,
}

/// Mutable state of a single conversion call.
pub struct ResolutionContext<'c> {
    pub config: &'c ConverterConfig,
    /// Full names of the types currently being built, innermost last.
    pub record_stack: Vec<String>,
    /// Resolved `$ref` targets keyed by absolute reference URI.
    pub imported_types: HashMap<String, SchemaNode>,
    /// Reference URI each named type was created from.
    pub type_origins: HashMap<String, String>,
    /// Fetched document text keyed by URL.
    pub content_cache: HashMap<String, String>,
    /// Full names of records whose `oneOf`/`anyOf` merge was deferred.
    pub types_with_unmerged: Vec<String>,
    pub registry: SchemaRegistry,
}

impl<'c> ResolutionContext<'c> {
    pub fn new(config: &'c ConverterConfig) -> Self {
        Self {
            config,
            record_stack: Vec::new(),
            imported_types: HashMap::new(),
            type_origins: HashMap::new(),
            content_cache: HashMap::new(),
            types_with_unmerged: Vec::new(),
            registry: SchemaRegistry::new(),
        }
    }

    pub fn max_recursion_depth(&self) -> usize {
        self.config.max_recursion_depth
    }

    pub fn utility_namespace(&self) -> String {
        self.config.effective_utility_namespace()
    }

    pub fn is_building(&self, fullname: &str) -> bool {
        self.record_stack.iter().any(|n| n == fullname)
    }

    pub fn enter(&mut self, fullname: String) {
        self.record_stack.push(fullname);
    }

    pub fn leave(&mut self) {
        self.record_stack.pop();
    }

    /// Record that `fullname` is the type for the schema at `uri`.
    pub fn claim(&mut self, fullname: &str, uri: &str) {
        self.type_origins
            .entry(fullname.to_string())
            .or_insert_with(|| uri.to_string());
    }

    /// Name already claimed for the schema at `uri`.
    pub fn claimed_name(&self, uri: &str) -> Option<String> {
        self.type_origins
            .iter()
            .find(|(_, origin)| *origin == uri)
            .map(|(fullname, _)| fullname.clone())
    }

    /// True when `fullname` exists or is being built for another schema.
    pub fn is_claimed_elsewhere(&self, fullname: &str, uri: &str) -> bool {
        let taken = self.registry.contains(fullname) || self.is_building(fullname);
        taken && !matches!(self.type_origins.get(fullname), Some(origin) if origin == uri)
    }

    /// `name`, or `name2`, `name3`, ... when another schema already owns it.
    pub fn unclaimed_name(&self, namespace: &str, name: &str, uri: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 2;
        while self.is_claimed_elsewhere(&compose_fullname(namespace, &candidate), uri) {
            candidate = format!("{name}{n}");
            n += 1;
        }
        candidate
    }

    /// Log a soft failure once and keep it on the registry.
    pub fn diagnose(&mut self, diagnostic: Diagnostic) {
        if self.registry.diagnostics().contains(&diagnostic) {
            return;
        }
        warn!("{diagnostic}");
        self.registry.push_diagnostic(diagnostic);
    }

    /// Reference to the `*_ref` wrapper of a type that is still being built.
    ///
    /// The wrapper is registered on first use and shared by every later
    /// re-entry into the same type.
    pub fn cycle_reference(&mut self, target: &str) -> SchemaNode {
        let (namespace, name) = split_fullname(target);
        let wrapper_name = compose_fullname(namespace, &format!("{name}_ref"));
        if !self.registry.contains(&wrapper_name) {
            self.registry
                .register(SchemaNode::Record(create_ref_wrapper(target)));
        }
        SchemaNode::TypeRef(wrapper_name)
    }

    pub fn into_registry(self) -> SchemaRegistry {
        self.registry
    }
}
