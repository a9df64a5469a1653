use serde::{Deserialize, Serialize};

use crate::choice::ChoiceConfig;

/// Options for structural inference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InferenceConfig {
    /// Namespace of the top-level record.
    pub namespace: String,
    /// Run discriminated-union detection on top-level and array-element
    /// object collections.
    pub infer_choices: bool,
    pub choice: ChoiceConfig,
    /// Nesting depth below which values are typed as the generic placeholder.
    pub max_depth: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            infer_choices: true,
            choice: ChoiceConfig::default(),
            max_depth: 40,
        }
    }
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    pub fn with_infer_choices(mut self, infer_choices: bool) -> Self {
        self.infer_choices = infer_choices;
        self
    }

    pub fn with_choice_config(mut self, choice: ChoiceConfig) -> Self {
        self.choice = choice;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nested_choice_config_from_json() {
        let config: InferenceConfig = serde_json::from_str(
            r#"{"namespace": "samples", "inferChoices": false, "choice": {"presenceRatio": 0.9}}"#,
        )
        .unwrap();
        assert_eq!(config.namespace, "samples");
        assert!(!config.infer_choices);
        assert_eq!(config.choice.presence_ratio, 0.9);
        assert_eq!(config.choice.similarity_threshold, 0.5);
        assert_eq!(config.max_depth, 40);
    }

    #[test]
    fn test_builders_override_defaults() {
        let config = InferenceConfig::new()
            .with_max_depth(3)
            .with_choice_config(ChoiceConfig {
                similarity_threshold: 0.9,
                ..ChoiceConfig::default()
            });
        assert_eq!(config.max_depth, 3);
        assert_eq!(config.choice.similarity_threshold, 0.9);
        assert!(config.infer_choices);
    }
}
