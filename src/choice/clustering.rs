use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::choice::document::{jaccard, DocumentInfo};
use crate::choice::ChoiceConfig;

/// A group of structurally similar documents.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaCluster {
    /// Indices of the member documents in the input slice.
    pub members: Vec<usize>,
    /// Union of the members' field names.
    pub merged_signature: BTreeSet<String>,
    /// Intersection of the members' field names.
    pub required_fields: BTreeSet<String>,
    /// Discriminator value shared by the members, once one is known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discriminator_value: Option<String>,
}

impl SchemaCluster {
    fn seed(doc: &DocumentInfo) -> Self {
        Self {
            members: vec![doc.index],
            merged_signature: doc.fields.clone(),
            required_fields: doc.fields.clone(),
            discriminator_value: None,
        }
    }

    /// A cluster over `docs`. The signatures are empty for an empty list.
    pub fn from_documents<'a>(docs: impl IntoIterator<Item = &'a DocumentInfo>) -> Self {
        let mut cluster = Self {
            members: Vec::new(),
            merged_signature: BTreeSet::new(),
            required_fields: BTreeSet::new(),
            discriminator_value: None,
        };
        for doc in docs {
            cluster.add(doc);
        }
        cluster
    }

    pub fn add(&mut self, doc: &DocumentInfo) {
        if self.members.is_empty() {
            self.required_fields = doc.fields.clone();
        } else {
            self.required_fields = self
                .required_fields
                .intersection(&doc.fields)
                .cloned()
                .collect();
        }
        self.merged_signature.extend(doc.fields.iter().cloned());
        self.members.push(doc.index);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn similarity(&self, doc: &DocumentInfo) -> f64 {
        jaccard(&self.merged_signature, &doc.fields)
    }
}

fn rebuild(assignment: &[usize], cluster_count: usize, docs: &[DocumentInfo]) -> Vec<SchemaCluster> {
    let mut clusters: Vec<SchemaCluster> = (0..cluster_count)
        .map(|_| SchemaCluster::from_documents(std::iter::empty()))
        .collect();
    for (doc, &c) in docs.iter().zip(assignment) {
        clusters[c].add(doc);
    }
    clusters
}

/// Group documents by the similarity of their field-name sets.
///
/// Each document joins the most similar cluster whose similarity reaches
/// the threshold, or starts a new one. Refinement passes then move a
/// document when another cluster beats its own by more than the move
/// margin. Empty clusters are dropped after every pass.
pub fn cluster_documents(docs: &[DocumentInfo], config: &ChoiceConfig) -> Vec<SchemaCluster> {
    let mut clusters: Vec<SchemaCluster> = Vec::new();
    let mut assignment: Vec<usize> = Vec::with_capacity(docs.len());

    for doc in docs {
        let best = clusters
            .iter()
            .enumerate()
            .map(|(i, c)| (i, c.similarity(doc)))
            .filter(|(_, sim)| *sim >= config.similarity_threshold)
            .max_by(|a, b| a.1.total_cmp(&b.1));
        match best {
            Some((i, _)) => {
                clusters[i].add(doc);
                assignment.push(i);
            }
            None => {
                clusters.push(SchemaCluster::seed(doc));
                assignment.push(clusters.len() - 1);
            }
        }
    }

    for pass in 0..config.refinement_passes {
        let mut moved = 0;
        for (pos, doc) in docs.iter().enumerate() {
            let current = assignment[pos];
            let own = clusters[current].similarity(doc);
            let better = clusters
                .iter()
                .enumerate()
                .filter(|(i, c)| *i != current && !c.is_empty())
                .map(|(i, c)| (i, c.similarity(doc)))
                .max_by(|a, b| a.1.total_cmp(&b.1));
            if let Some((target, sim)) = better {
                if sim > own + config.move_margin {
                    assignment[pos] = target;
                    moved += 1;
                }
            }
        }

        let mut rebuilt = rebuild(&assignment, clusters.len(), docs);
        let mut remap = vec![0; rebuilt.len()];
        let mut next = 0;
        for (i, cluster) in rebuilt.iter().enumerate() {
            if !cluster.is_empty() {
                remap[i] = next;
                next += 1;
            }
        }
        for slot in assignment.iter_mut() {
            *slot = remap[*slot];
        }
        rebuilt.retain(|c| !c.is_empty());
        clusters = rebuilt;

        debug!("Refinement pass {} moved {moved} documents", pass + 1);
        if moved == 0 {
            break;
        }
    }
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn docs(values: &[serde_json::Value]) -> Vec<DocumentInfo> {
        values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| DocumentInfo::from_value(i, v))
            .collect()
    }

    #[test]
    fn test_similar_documents_share_a_cluster() {
        let docs = docs(&[
            json!({"id": 1, "name": "a"}),
            json!({"id": 2, "name": "b", "age": 3}),
            json!({"id": 3, "name": "c", "email": "x"}),
        ]);
        let clusters = cluster_documents(&docs, &ChoiceConfig::default());
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members, vec![0, 1, 2]);
        assert_eq!(clusters[0].required_fields.len(), 2);
        assert_eq!(clusters[0].merged_signature.len(), 4);
    }

    #[test]
    fn test_disjoint_documents_split() {
        let docs = docs(&[
            json!({"kind": "a", "x": 1, "y": 2, "z": 3}),
            json!({"kind": "b", "p": 1, "q": 2, "r": 3}),
            json!({"kind": "a", "x": 4, "y": 5, "z": 6}),
        ]);
        let clusters = cluster_documents(&docs, &ChoiceConfig::default());
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].members, vec![0, 2]);
        assert_eq!(clusters[1].members, vec![1]);
    }
}
