//! Discriminated-union detection over sample documents.
//!
//! Documents are clustered by the Jaccard similarity of their field-name
//! sets; then a scalar field whose values explain the split (or, for a
//! structurally uniform collection, whose value groups differ in shape) is
//! accepted as the discriminator. When no top-level field qualifies, nested
//! payload objects are searched the same way.

pub mod clustering;
pub mod discriminator;
pub mod document;

pub use clustering::SchemaCluster;
pub use discriminator::DiscriminatorCandidate;
pub use document::DocumentInfo;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use clustering::cluster_documents;
use discriminator::{find_candidates, select_for_clusters, select_for_homogeneous};

/// Thresholds of the detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChoiceConfig {
    /// Minimum Jaccard similarity for a document to join a cluster.
    pub similarity_threshold: f64,
    pub refinement_passes: usize,
    /// How much better another cluster must match before a document moves.
    pub move_margin: f64,
    /// Share of documents a candidate field must appear in.
    pub presence_ratio: f64,
    /// Distinct-to-present ratio above which a field looks like an identifier.
    pub identifier_uniqueness: f64,
    /// An identifier also has more distinct values than this many per cluster.
    pub identifier_cluster_factor: f64,
    /// Share of values that must map to a single cluster.
    pub multi_cluster_ratio: f64,
    /// Value groups less similar than this are distinct variants.
    pub homogeneous_similarity: f64,
    /// Share of values that must name a sibling field for an envelope.
    pub envelope_ratio: f64,
    /// Share of documents that must hold a nested object for it to be searched.
    pub nested_presence: f64,
    pub max_nested_depth: usize,
    pub guard_max_distinguishing: f64,
    pub guard_min_similarity: f64,
    pub guard_min_samples: usize,
}

impl Default for ChoiceConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.5,
            refinement_passes: 3,
            move_margin: 0.1,
            presence_ratio: 0.8,
            identifier_uniqueness: 0.8,
            identifier_cluster_factor: 3.0,
            multi_cluster_ratio: 0.9,
            homogeneous_similarity: 0.7,
            envelope_ratio: 0.5,
            nested_presence: 0.8,
            max_nested_depth: 2,
            guard_max_distinguishing: 1.5,
            guard_min_similarity: 0.6,
            guard_min_samples: 5,
        }
    }
}

/// What the detector concluded about a document collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ChoiceResult {
    /// One shape; fold the documents into a single record.
    NotAChoice,
    /// A top-level field tags the variants; one cluster per value.
    FlatDiscriminatedUnion {
        field: String,
        clusters: Vec<SchemaCluster>,
    },
    /// The tag lives in the nested object reached through `path`.
    NestedDiscriminatedUnion {
        path: Vec<String>,
        field: String,
        clusters: Vec<SchemaCluster>,
    },
    /// Structurally distinct clusters without a tag field.
    UndiscriminatedUnion { clusters: Vec<SchemaCluster> },
}

impl ChoiceResult {
    pub fn is_choice(&self) -> bool {
        !matches!(self, ChoiceResult::NotAChoice)
    }

    pub fn discriminator_field(&self) -> Option<&str> {
        match self {
            ChoiceResult::FlatDiscriminatedUnion { field, .. }
            | ChoiceResult::NestedDiscriminatedUnion { field, .. } => Some(field),
            _ => None,
        }
    }

    pub fn nested_path(&self) -> Option<&[String]> {
        match self {
            ChoiceResult::NestedDiscriminatedUnion { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn clusters(&self) -> &[SchemaCluster] {
        match self {
            ChoiceResult::NotAChoice => &[],
            ChoiceResult::FlatDiscriminatedUnion { clusters, .. }
            | ChoiceResult::NestedDiscriminatedUnion { clusters, .. }
            | ChoiceResult::UndiscriminatedUnion { clusters } => clusters,
        }
    }

    fn reindexed(self, outer: &[usize], name: &str) -> Option<Self> {
        let remap = |clusters: Vec<SchemaCluster>| -> Vec<SchemaCluster> {
            clusters
                .into_iter()
                .map(|mut c| {
                    c.members = c.members.iter().map(|&i| outer[i]).collect();
                    c
                })
                .collect()
        };
        match self {
            ChoiceResult::FlatDiscriminatedUnion { field, clusters } => {
                Some(ChoiceResult::NestedDiscriminatedUnion {
                    path: vec![name.to_string()],
                    field,
                    clusters: remap(clusters),
                })
            }
            ChoiceResult::NestedDiscriminatedUnion {
                mut path,
                field,
                clusters,
            } => {
                path.insert(0, name.to_string());
                Some(ChoiceResult::NestedDiscriminatedUnion {
                    path,
                    field,
                    clusters: remap(clusters),
                })
            }
            _ => None,
        }
    }
}

/// Clusters documents and looks for the field that tells them apart.
#[derive(Debug, Clone, Default)]
pub struct ChoiceDetector {
    config: ChoiceConfig,
}

impl ChoiceDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ChoiceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChoiceConfig {
        &self.config
    }

    /// Classify a collection of documents. Non-object documents are ignored.
    pub fn detect(&self, documents: &[&Value]) -> ChoiceResult {
        self.detect_at(documents, 0)
    }

    fn detect_at(&self, documents: &[&Value], depth: usize) -> ChoiceResult {
        let docs: Vec<DocumentInfo> = documents
            .iter()
            .enumerate()
            .filter_map(|(i, d)| DocumentInfo::from_value(i, d))
            .collect();
        if docs.len() < 2 {
            return ChoiceResult::NotAChoice;
        }

        let clusters = cluster_documents(&docs, &self.config);
        let candidates = find_candidates(&docs, &clusters, &self.config);
        let chosen = if clusters.len() > 1 {
            select_for_clusters(&candidates, &self.config)
        } else {
            select_for_homogeneous(&candidates, &docs, &self.config)
        };

        if let Some(candidate) = chosen {
            debug!(
                "Discriminator {} with {} values over {} documents",
                candidate.field,
                candidate.values.len(),
                docs.len()
            );
            let clusters = candidate
                .groups(&docs)
                .into_iter()
                .map(|(value, members)| {
                    let mut cluster = SchemaCluster::from_documents(members);
                    cluster.discriminator_value = Some(value);
                    cluster
                })
                .collect();
            return ChoiceResult::FlatDiscriminatedUnion {
                field: candidate.field.clone(),
                clusters,
            };
        }

        if depth < self.config.max_nested_depth {
            if let Some(nested) = self.detect_nested(documents, &docs, depth) {
                return nested;
            }
        }

        if clusters.len() > 1 {
            ChoiceResult::UndiscriminatedUnion { clusters }
        } else {
            ChoiceResult::NotAChoice
        }
    }

    fn detect_nested(&self, documents: &[&Value], docs: &[DocumentInfo], depth: usize) -> Option<ChoiceResult> {
        let names: BTreeSet<&String> = docs.iter().flat_map(|d| d.fields.iter()).collect();
        for name in names {
            let mut outer = Vec::new();
            let mut nested = Vec::new();
            for doc in docs {
                if let Some(value @ Value::Object(_)) = documents[doc.index].get(name.as_str()) {
                    outer.push(doc.index);
                    nested.push(value);
                }
            }
            if (nested.len() as f64) < self.config.nested_presence * docs.len() as f64 {
                continue;
            }
            if let Some(result) = self.detect_at(&nested, depth + 1).reindexed(&outer, name) {
                debug!("Nested discriminator found under {name}");
                return Some(result);
            }
        }
        None
    }
}

/// Run the detector with the default thresholds.
pub fn infer_choice(documents: &[Value]) -> ChoiceResult {
    let refs: Vec<&Value> = documents.iter().collect();
    ChoiceDetector::default().detect(&refs)
}
