use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::choice::clustering::SchemaCluster;
use crate::choice::document::{jaccard, DocumentInfo};
use crate::choice::ChoiceConfig;

const BOOLEAN_LIKE: [&str; 6] = ["true", "false", "yes", "no", "0", "1"];

/// A field that might carry the type tag of a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscriminatorCandidate {
    pub field: String,
    /// Observed values in order of first appearance.
    pub values: Vec<String>,
    /// For each value, the clusters its documents fall into.
    pub value_clusters: BTreeMap<String, BTreeSet<usize>>,
    /// Share of values that map to exactly one cluster.
    pub correlation: f64,
}

impl DiscriminatorCandidate {
    /// Documents grouped by their value of this field, in value order.
    pub fn groups<'d>(&self, docs: &'d [DocumentInfo]) -> Vec<(String, Vec<&'d DocumentInfo>)> {
        self.values
            .iter()
            .map(|value| {
                let members = docs
                    .iter()
                    .filter(|d| d.values.get(&self.field) == Some(value))
                    .collect();
                (value.clone(), members)
            })
            .collect()
    }
}

fn cluster_of(clusters: &[SchemaCluster], index: usize) -> Option<usize> {
    clusters.iter().position(|c| c.members.contains(&index))
}

/// Fields that pass the presence, cardinality and value-kind filters.
///
/// Candidates come back ordered by fewest distinct values, then by name.
pub fn find_candidates(
    docs: &[DocumentInfo],
    clusters: &[SchemaCluster],
    config: &ChoiceConfig,
) -> Vec<DiscriminatorCandidate> {
    let mut names: BTreeSet<&String> = BTreeSet::new();
    for doc in docs {
        names.extend(doc.values.keys());
    }

    let mut candidates = Vec::new();
    for name in names {
        let present: Vec<&DocumentInfo> = docs.iter().filter(|d| d.values.contains_key(name)).collect();
        if (present.len() as f64) < config.presence_ratio * docs.len() as f64 {
            continue;
        }

        let mut values: Vec<String> = Vec::new();
        let mut value_clusters: BTreeMap<String, BTreeSet<usize>> = BTreeMap::new();
        for doc in &present {
            let value = &doc.values[name];
            if !values.contains(value) {
                values.push(value.clone());
            }
            let entry = value_clusters.entry(value.clone()).or_default();
            if let Some(c) = cluster_of(clusters, doc.index) {
                entry.insert(c);
            }
        }

        if values.len() < 2 {
            continue;
        }
        if values
            .iter()
            .all(|v| BOOLEAN_LIKE.contains(&v.to_lowercase().as_str()))
        {
            debug!("Rejecting {name}: boolean-like values");
            continue;
        }
        if values.iter().all(|v| v.parse::<f64>().is_ok()) {
            debug!("Rejecting {name}: numeric values");
            continue;
        }
        let uniqueness = values.len() as f64 / present.len() as f64;
        if uniqueness > config.identifier_uniqueness
            && values.len() as f64 > config.identifier_cluster_factor * clusters.len() as f64
        {
            debug!("Rejecting {name}: looks like an identifier");
            continue;
        }

        let single = value_clusters.values().filter(|c| c.len() == 1).count();
        candidates.push(DiscriminatorCandidate {
            field: name.clone(),
            correlation: single as f64 / values.len() as f64,
            values,
            value_clusters,
        });
    }

    candidates.sort_by(|a, b| a.values.len().cmp(&b.values.len()).then(a.field.cmp(&b.field)));
    candidates
}

/// Multiple structural clusters: the best candidate whose values each map
/// to a single cluster often enough.
pub fn select_for_clusters<'c>(
    candidates: &'c [DiscriminatorCandidate],
    config: &ChoiceConfig,
) -> Option<&'c DiscriminatorCandidate> {
    candidates
        .iter()
        .filter(|c| c.correlation >= config.multi_cluster_ratio)
        .max_by(|a, b| {
            a.correlation
                .total_cmp(&b.correlation)
                .then(b.values.len().cmp(&a.values.len()))
                .then(b.field.cmp(&a.field))
        })
}

fn signature(group: &[&DocumentInfo]) -> BTreeSet<String> {
    group.iter().flat_map(|d| d.fields.iter().cloned()).collect()
}

fn normalized(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// The envelope pattern: documents of a value carry a field named after
/// that value, e.g. `{"type": "click", "click": {...}}`.
fn is_envelope(candidate: &DiscriminatorCandidate, groups: &[(String, Vec<&DocumentInfo>)], config: &ChoiceConfig) -> bool {
    let matching = groups
        .iter()
        .filter(|(value, members)| {
            let wanted = normalized(value);
            !wanted.is_empty()
                && members.iter().any(|d| {
                    d.fields
                        .iter()
                        .any(|f| f != &candidate.field && normalized(f) == wanted)
                })
        })
        .count();
    matching as f64 >= config.envelope_ratio * groups.len() as f64
}

/// Average Jaccard similarity over every pair of documents drawn one from
/// each group.
fn cross_similarity(a: &[&DocumentInfo], b: &[&DocumentInfo]) -> f64 {
    let pairs = a.len() * b.len();
    if pairs == 0 {
        return 1.0;
    }
    let total: f64 = a
        .iter()
        .flat_map(|x| b.iter().map(move |y| jaccard(&x.fields, &y.fields)))
        .sum();
    total / pairs as f64
}

/// Two values whose documents barely differ and are too few to tell
/// variants from scattered optional fields.
fn is_weak_split(groups: &[(String, Vec<&DocumentInfo>)], field: &str, config: &ChoiceConfig) -> bool {
    let [(_, a), (_, b)] = groups else {
        return false;
    };
    let mut sig_a = signature(a);
    let mut sig_b = signature(b);
    sig_a.remove(field);
    sig_b.remove(field);
    if sig_a != sig_b && (sig_a.is_subset(&sig_b) || sig_b.is_subset(&sig_a)) {
        return false;
    }
    let distinguishing = sig_a.symmetric_difference(&sig_b).count() as f64 / 2.0;
    let similarity = cross_similarity(a, b);
    let min_samples = a.len().min(b.len());
    distinguishing <= config.guard_max_distinguishing
        && similarity > config.guard_min_similarity
        && min_samples < config.guard_min_samples
}

/// One structural cluster: accept a candidate whose value groups differ in
/// shape, or that follows the envelope pattern.
pub fn select_for_homogeneous<'c>(
    candidates: &'c [DiscriminatorCandidate],
    docs: &[DocumentInfo],
    config: &ChoiceConfig,
) -> Option<&'c DiscriminatorCandidate> {
    for candidate in candidates {
        let groups = candidate.groups(docs);
        if is_envelope(candidate, &groups, config) {
            return Some(candidate);
        }

        let signatures: Vec<BTreeSet<String>> = groups.iter().map(|(_, g)| signature(g)).collect();
        let mut pairs = 0usize;
        let mut total = 0.0;
        for (i, (_, a)) in groups.iter().enumerate() {
            for (_, b) in &groups[i + 1..] {
                pairs += 1;
                total += cross_similarity(a, b);
            }
        }
        let average = if pairs == 0 { 1.0 } else { total / pairs as f64 };
        let low_similarity = average < config.homogeneous_similarity;

        let consistent = groups
            .iter()
            .all(|(_, g)| g.iter().all(|d| d.fields == g[0].fields));
        let distinct = signatures
            .iter()
            .enumerate()
            .all(|(i, s)| signatures[i + 1..].iter().all(|o| o != s));

        if (low_similarity || (consistent && distinct))
            && !is_weak_split(&groups, &candidate.field, config)
        {
            return Some(candidate);
        }
        debug!(
            "Rejecting {}: value groups share their shape (similarity {average:.2})",
            candidate.field
        );
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choice::clustering::cluster_documents;
    use serde_json::{json, Value};

    fn docs(values: &[Value]) -> Vec<DocumentInfo> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| DocumentInfo::from_value(i, v))
            .collect()
    }

    #[test]
    fn test_candidate_filters() {
        let docs = docs(&[
            json!({"kind": "a", "flag": "yes", "n": 1, "id": "u1"}),
            json!({"kind": "b", "flag": "no", "n": 2, "id": "u2"}),
            json!({"kind": "a", "flag": "yes", "n": 3, "id": "u3"}),
            json!({"kind": "b", "flag": "no", "n": 4, "id": "u4"}),
        ]);
        let config = ChoiceConfig::default();
        let clusters = cluster_documents(&docs, &config);
        let names: Vec<_> = find_candidates(&docs, &clusters, &config)
            .into_iter()
            .map(|c| c.field)
            .collect();
        assert_eq!(names, vec!["kind"]);
    }

    #[test]
    fn test_envelope_is_accepted() {
        let docs = docs(&[
            json!({"type": "click", "click": {"x": 1}, "ts": "t1"}),
            json!({"type": "scroll", "scroll": {"dy": 2}, "ts": "t2"}),
            json!({"type": "click", "click": {"x": 3}, "ts": "t3"}),
        ]);
        let config = ChoiceConfig::default();
        let clusters = vec![SchemaCluster::from_documents(&docs)];
        let candidates = find_candidates(&docs, &clusters, &config);
        let chosen = select_for_homogeneous(&candidates, &docs, &config).unwrap();
        assert_eq!(chosen.field, "type");
    }

    #[test]
    fn test_weak_two_value_split_is_rejected() {
        let docs = docs(&[
            json!({"status": "open", "a": 1, "b": 2, "c": 3, "d": 4, "x": 1}),
            json!({"status": "closed", "a": 1, "b": 2, "c": 3, "d": 4, "y": 1}),
        ]);
        let config = ChoiceConfig::default();
        let clusters = vec![SchemaCluster::from_documents(&docs)];
        let candidates = find_candidates(&docs, &clusters, &config);
        assert!(select_for_homogeneous(&candidates, &docs, &config).is_none());
    }

    #[test]
    fn test_similarity_is_averaged_per_document_pair() {
        let docs = docs(&[
            json!({"status": "active", "id": 1, "name": "a"}),
            json!({"status": "active", "id": 2, "name": "b", "age": 3}),
            json!({"status": "inactive", "id": 3, "name": "c", "email": "e"}),
            json!({"status": "inactive", "id": 4, "name": "d"}),
        ]);
        let (active, inactive) = docs.split_at(2);
        let active: Vec<&DocumentInfo> = active.iter().collect();
        let inactive: Vec<&DocumentInfo> = inactive.iter().collect();
        // 3/4, 1, 3/5, 3/4
        assert!((cross_similarity(&active, &inactive) - 0.775).abs() < 1e-9);

        let config = ChoiceConfig::default();
        let clusters = vec![SchemaCluster::from_documents(&docs)];
        let candidates = find_candidates(&docs, &clusters, &config);
        assert!(select_for_homogeneous(&candidates, &docs, &config).is_none());
    }
}
