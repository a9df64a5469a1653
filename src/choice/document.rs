use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// The features of one sample document that clustering looks at.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentInfo {
    /// Position of the document in the input slice.
    pub index: usize,
    /// Top-level field names.
    pub fields: BTreeSet<String>,
    /// Scalar top-level values, stringified. Nulls, objects and arrays are
    /// left out.
    pub values: BTreeMap<String, String>,
}

impl DocumentInfo {
    /// Features of `document`, or `None` if it is not an object.
    pub fn from_value(index: usize, document: &Value) -> Option<Self> {
        let obj = document.as_object()?;
        let mut values = BTreeMap::new();
        for (key, value) in obj {
            if let Some(text) = scalar_text(value) {
                values.insert(key.clone(), text);
            }
        }
        Some(Self {
            index,
            fields: obj.keys().cloned().collect(),
            values,
        })
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Jaccard similarity `|A∩B| / |A∪B|`. Two empty sets are identical.
pub fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 1.0;
    }
    a.intersection(b).count() as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_document_features() {
        let info = DocumentInfo::from_value(
            3,
            &json!({"kind": "a", "n": 1, "ok": true, "nested": {"x": 1}, "none": null}),
        )
        .unwrap();
        assert_eq!(info.index, 3);
        assert_eq!(info.fields.len(), 5);
        assert_eq!(info.values["kind"], "a");
        assert_eq!(info.values["n"], "1");
        assert_eq!(info.values["ok"], "true");
        assert!(!info.values.contains_key("nested"));
        assert!(!info.values.contains_key("none"));
        assert!(DocumentInfo::from_value(0, &json!([1, 2])).is_none());
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&set(&["a", "b"]), &set(&["a", "b"])), 1.0);
        assert_eq!(jaccard(&set(&["a", "b"]), &set(&["b", "c"])), 1.0 / 3.0);
        assert_eq!(jaccard(&set(&[]), &set(&[])), 1.0);
        assert_eq!(jaccard(&set(&["a"]), &set(&[])), 0.0);
    }
}
