//! Structural schema inference from sample documents.
//!
//! Each object is inferred as a record, identical samples are skipped by
//! their tree hash, candidates are de-duplicated by structural hash and the
//! rest are folded: a field missing from some samples becomes nullable
//! with a `null` default, differing types become unions. Object
//! collections at the top level and in arrays are first checked for
//! discriminated unions.

pub mod config;
pub mod folding;
pub mod xml;

pub use config::InferenceConfig;

use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

use crate::avro::{Field, PrimitiveKind, Record, SchemaNode};
use crate::choice::{ChoiceDetector, ChoiceResult, SchemaCluster};
use crate::common::generic::generic_type;
use crate::common::hash::get_tree_hash;
use crate::common::names::{avro_name, avro_name_with_altname, type_name_for};
use crate::converter::utils::nested_namespace;
use crate::error::InferenceError;
use folding::{fold_types, settle_default, settle_unknown};

static MISSING: Value = Value::Null;

/// Infers an IR schema from a collection of JSON-like documents.
#[derive(Debug, Clone, Default)]
pub struct StructureInferrer {
    config: InferenceConfig,
    detector: ChoiceDetector,
}

fn unique_values<'v>(values: &[&'v Value]) -> Vec<&'v Value> {
    let mut seen = HashSet::new();
    values
        .iter()
        .copied()
        .filter(|v| {
            let hash = get_tree_hash(v);
            seen.insert((hash.hash_value, hash.count))
        })
        .collect()
}

fn infer_number(value: &serde_json::Number) -> SchemaNode {
    if value.is_i64() || value.is_u64() {
        PrimitiveKind::Long.into()
    } else {
        PrimitiveKind::Double.into()
    }
}

/// Field `segment` of `record`, matched by JSON name.
fn field_mut<'r>(record: &'r mut Record, segment: &str) -> Option<&'r mut Field> {
    record.fields.iter_mut().find(|f| f.json_name() == segment)
}

fn record_member_mut(node: &mut SchemaNode) -> Option<&mut Record> {
    match node {
        SchemaNode::Record(record) => Some(record),
        SchemaNode::Union(members) => members.iter_mut().find_map(|m| match m {
            SchemaNode::Record(record) => Some(record),
            _ => None,
        }),
        _ => None,
    }
}

/// Rewrite the type of the field reached through `path`.
fn replace_at_path<F>(record: &mut Record, path: &[String], rewrite: F) -> bool
where
    F: FnOnce(SchemaNode) -> SchemaNode,
{
    let Some((first, rest)) = path.split_first() else {
        return false;
    };
    let Some(field) = field_mut(record, first) else {
        return false;
    };
    if rest.is_empty() {
        let current = std::mem::replace(&mut field.field_type, SchemaNode::null());
        field.field_type = rewrite(current);
        settle_default(field);
        return true;
    }
    match record_member_mut(&mut field.field_type) {
        Some(inner) => replace_at_path(inner, rest, rewrite),
        None => false,
    }
}

impl StructureInferrer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: InferenceConfig) -> Self {
        let detector = ChoiceDetector::with_config(config.choice.clone());
        Self { config, detector }
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Infer the schema of `values`, naming the top-level record `type_name`.
    pub fn infer(&self, type_name: &str, values: &[Value]) -> SchemaNode {
        let refs: Vec<&Value> = values.iter().collect();
        let node = self.infer_slot(&refs, &avro_name(type_name), &self.config.namespace, 0, true);
        settle_unknown(node)
    }

    /// Like [`StructureInferrer::infer`], but an empty sample set is an error.
    pub fn try_infer(&self, type_name: &str, values: &[Value]) -> Result<SchemaNode, InferenceError> {
        if values.is_empty() {
            return Err(InferenceError::NoDocuments);
        }
        Ok(self.infer(type_name, values))
    }

    /// Fold every value observed in one slot.
    fn infer_slot(
        &self,
        values: &[&Value],
        name: &str,
        namespace: &str,
        depth: usize,
        allow_choice: bool,
    ) -> SchemaNode {
        if depth > self.config.max_depth {
            return generic_type();
        }
        let mut candidates = Vec::new();
        let objects: Vec<&Value> = values.iter().copied().filter(|v| v.is_object()).collect();
        if !objects.is_empty() {
            candidates.push(self.infer_objects(&objects, name, namespace, depth, allow_choice));
        }
        for value in unique_values(values).into_iter().filter(|v| !v.is_object()) {
            candidates.push(self.infer_value(value, name, namespace, depth));
        }
        fold_types(candidates)
    }

    fn infer_value(&self, value: &Value, name: &str, namespace: &str, depth: usize) -> SchemaNode {
        match value {
            Value::Null => SchemaNode::null(),
            Value::Bool(_) => PrimitiveKind::Boolean.into(),
            Value::Number(n) => infer_number(n),
            Value::String(_) => SchemaNode::string(),
            Value::Array(items) => {
                let refs: Vec<&Value> = items.iter().collect();
                SchemaNode::array(self.infer_slot(
                    &refs,
                    &format!("{name}Item"),
                    namespace,
                    depth + 1,
                    true,
                ))
            }
            Value::Object(_) => SchemaNode::Record(self.infer_record(value, name, namespace, depth)),
        }
    }

    fn infer_record(&self, value: &Value, name: &str, namespace: &str, depth: usize) -> Record {
        let mut record = Record::new(name, namespace);
        let Some(obj) = value.as_object() else {
            return record;
        };
        let child_namespace = nested_namespace(namespace, name);
        for (key, child) in obj {
            let (mut field_name, mut json_name) = avro_name_with_altname(key);
            if record.field(&field_name).is_some() {
                let mut n = 2;
                while record.field(&format!("{field_name}_{n}")).is_some() {
                    n += 1;
                }
                field_name = format!("{field_name}_{n}");
                json_name = Some(key.clone());
            }
            let field_type = if depth >= self.config.max_depth {
                generic_type()
            } else {
                self.infer_value(child, &type_name_for(key), &child_namespace, depth + 1)
            };
            let mut field = Field::new(&field_name, field_type);
            if let Some(json_name) = json_name {
                field.altnames.insert("json".to_string(), json_name);
            }
            settle_default(&mut field);
            record.fields.push(field);
        }
        record
    }

    /// One record per distinct sample, folded together.
    fn fold_objects(&self, objects: &[&Value], name: &str, namespace: &str, depth: usize) -> SchemaNode {
        let candidates: Vec<SchemaNode> = unique_values(objects)
            .into_iter()
            .map(|o| SchemaNode::Record(self.infer_record(o, name, namespace, depth)))
            .collect();
        fold_types(candidates)
    }

    fn members_of<'v>(objects: &[&'v Value], cluster: &SchemaCluster) -> Vec<&'v Value> {
        cluster.members.iter().map(|&i| objects[i]).collect()
    }

    /// Samples that no cluster claimed, e.g. those without the discriminator.
    fn unclaimed<'v>(objects: &[&'v Value], clusters: &[SchemaCluster]) -> Vec<&'v Value> {
        let claimed: HashSet<usize> = clusters.iter().flat_map(|c| c.members.iter().copied()).collect();
        objects
            .iter()
            .enumerate()
            .filter(|(i, _)| !claimed.contains(i))
            .map(|(_, o)| *o)
            .collect()
    }

    fn variant_name(cluster: &SchemaCluster, fallback: &str) -> String {
        match cluster.discriminator_value.as_deref() {
            Some(value) => type_name_for(value),
            None => fallback.to_string(),
        }
    }

    fn infer_variants(
        &self,
        objects: &[&Value],
        clusters: &[SchemaCluster],
        name: &str,
        namespace: &str,
        depth: usize,
    ) -> Vec<SchemaNode> {
        let mut variants: Vec<SchemaNode> = clusters
            .iter()
            .enumerate()
            .map(|(i, cluster)| {
                let variant = Self::variant_name(cluster, &format!("{name}Variant{}", i + 1));
                self.fold_objects(&Self::members_of(objects, cluster), &variant, namespace, depth)
            })
            .collect();
        let rest = Self::unclaimed(objects, clusters);
        if !rest.is_empty() {
            variants.push(self.fold_objects(&rest, name, namespace, depth));
        }
        variants
    }

    fn infer_objects(
        &self,
        objects: &[&Value],
        name: &str,
        namespace: &str,
        depth: usize,
        allow_choice: bool,
    ) -> SchemaNode {
        if !(allow_choice && self.config.infer_choices && objects.len() >= 2) {
            return self.fold_objects(objects, name, namespace, depth);
        }

        match self.detector.detect(objects) {
            ChoiceResult::NotAChoice => self.fold_objects(objects, name, namespace, depth),
            ChoiceResult::FlatDiscriminatedUnion { field, clusters } => {
                debug!("{name} is a union discriminated by {field}");
                fold_types(self.infer_variants(objects, &clusters, name, namespace, depth))
            }
            ChoiceResult::UndiscriminatedUnion { clusters } => {
                debug!("{name} splits into {} variants", clusters.len());
                fold_types(self.infer_variants(objects, &clusters, name, namespace, depth))
            }
            ChoiceResult::NestedDiscriminatedUnion {
                path,
                field,
                clusters,
            } => {
                debug!("{name} carries a union at {} discriminated by {field}", path.join("."));
                self.infer_nested_choice(objects, &path, &clusters, name, namespace, depth)
            }
        }
    }

    /// The outer record is folded as usual; the payload field at `path`
    /// becomes the union of one record per discriminator value.
    fn infer_nested_choice(
        &self,
        objects: &[&Value],
        path: &[String],
        clusters: &[SchemaCluster],
        name: &str,
        namespace: &str,
        depth: usize,
    ) -> SchemaNode {
        let base = self.fold_objects(objects, name, namespace, depth);
        let SchemaNode::Record(mut record) = base else {
            return base;
        };

        let mut owner_name = name.to_string();
        let mut owner_namespace = namespace.to_string();
        for segment in &path[..path.len().saturating_sub(1)] {
            owner_namespace = nested_namespace(&owner_namespace, &owner_name);
            owner_name = type_name_for(segment);
        }
        let Some(last) = path.last() else {
            return SchemaNode::Record(record);
        };
        let payload_namespace = nested_namespace(&owner_namespace, &owner_name);
        let payload_name = type_name_for(last);

        let payloads: Vec<&Value> = objects
            .iter()
            .map(|o| {
                path.iter()
                    .try_fold(*o, |current, segment| current.get(segment.as_str()))
                    .unwrap_or(&MISSING)
            })
            .collect();
        let payload_depth = depth + path.len();
        let mut variants: Vec<SchemaNode> = clusters
            .iter()
            .enumerate()
            .map(|(i, cluster)| {
                let variant = Self::variant_name(cluster, &format!("{payload_name}Variant{}", i + 1));
                self.fold_objects(
                    &Self::members_of(&payloads, cluster),
                    &variant,
                    &payload_namespace,
                    payload_depth,
                )
            })
            .collect();
        let rest: Vec<&Value> = Self::unclaimed(&payloads, clusters)
            .into_iter()
            .filter(|p| p.is_object())
            .collect();
        if !rest.is_empty() {
            variants.push(self.fold_objects(&rest, &payload_name, &payload_namespace, payload_depth));
        }

        let replaced = replace_at_path(&mut record, path, |current| {
            let mut members: Vec<SchemaNode> = match current {
                SchemaNode::Union(members) => members,
                other => vec![other],
            };
            members.retain(|m| !matches!(m, SchemaNode::Record(_)));
            members.extend(variants);
            fold_types(members)
        });
        if !replaced {
            debug!("Payload path {} not found on {name}", path.join("."));
        }
        SchemaNode::Record(record)
    }
}

/// Infer with the default configuration.
pub fn infer(type_name: &str, values: &[Value]) -> SchemaNode {
    StructureInferrer::new().infer(type_name, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(node: &SchemaNode) -> &Record {
        node.as_record().expect("expected a record")
    }

    #[test]
    fn test_scalars_and_optional_fields() {
        let docs = vec![
            json!({"id": 1, "score": 2.5, "name": "a"}),
            json!({"id": 2, "score": 3, "name": "b", "tag": null}),
        ];
        let inferrer =
            StructureInferrer::with_config(InferenceConfig::new().with_namespace("ns").with_infer_choices(false));
        let node = inferrer.infer("Person", &docs);
        let person = record(&node);
        assert_eq!(person.fullname(), "ns.Person");
        assert_eq!(person.field("id").unwrap().field_type, PrimitiveKind::Long.into());
        assert_eq!(person.field("score").unwrap().field_type, PrimitiveKind::Double.into());
        assert!(person.field("name").unwrap().default.is_none());
        let tag = person.field("tag").unwrap();
        assert!(tag.field_type.is_null());
        assert_eq!(tag.default, Some(Value::Null));
    }

    #[test]
    fn test_nested_names_and_namespaces() {
        let docs = vec![json!({
            "home-address": {"city": "Oslo"},
            "orders": [{"total": 1}, {"total": 2, "note": "x"}]
        })];
        let node = StructureInferrer::with_config(InferenceConfig::new().with_namespace("ns"))
            .infer("Customer", &docs);
        let customer = record(&node);

        let address = customer.fields[0].clone();
        assert_eq!(address.name, "home_address");
        assert_eq!(address.json_name(), "home-address");
        assert_eq!(
            address.field_type.fullname().as_deref(),
            Some("ns.Customer_types.HomeAddress")
        );

        let SchemaNode::Array(items) = &customer.fields[1].field_type else {
            panic!("expected an array");
        };
        let item = record(items);
        assert_eq!(item.fullname(), "ns.Customer_types.OrdersItem");
        assert!(item.field("note").unwrap().field_type.is_nullable());
    }

    #[test]
    fn test_identical_elements_collapse() {
        let items: Vec<Value> = (0..500).map(|_| json!({"a": 1, "b": "x"})).collect();
        let node = infer("Row", &[json!({ "rows": items })]);
        let SchemaNode::Array(items) = &record(&node).fields[0].field_type else {
            panic!("expected an array");
        };
        assert_eq!(record(items).fields.len(), 2);
    }

    #[test]
    fn test_discriminated_documents_become_variants() {
        let docs = vec![
            json!({"kind": "circle", "radius": 1.0, "cx": 0, "cy": 0}),
            json!({"kind": "rect", "width": 2.0, "height": 1.0, "origin": "tl"}),
            json!({"kind": "circle", "radius": 2.0, "cx": 1, "cy": 1}),
        ];
        let node = StructureInferrer::with_config(InferenceConfig::new().with_namespace("ns"))
            .infer("Shape", &docs);
        let SchemaNode::Union(members) = node else {
            panic!("expected a union");
        };
        let names: Vec<_> = members.iter().filter_map(|m| m.name()).collect();
        assert_eq!(names, vec!["Circle", "Rect"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            StructureInferrer::new().try_infer("X", &[]),
            Err(InferenceError::NoDocuments)
        ));
    }
}
