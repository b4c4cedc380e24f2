//! Configuration for the contextual embedding layer.

use crate::config::{DEFAULT_CONTEXTUAL_HANDLE, DEFAULT_OUTPUT_KEY, DEFAULT_SIGNATURE};
use serde::{Deserialize, Serialize};

/// Configuration for [`ContextualEmbeddingLayer`](super::ContextualEmbeddingLayer).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextualEmbeddingConfig {
    /// Identifier passed to the model hub
    pub handle: String,

    /// Whether the model's variables join the trainable set
    pub trainable: bool,

    /// Signature invoked on the model
    pub signature: String,

    /// Output entry holding the per-token vectors
    pub output_key: String,
}

impl Default for ContextualEmbeddingConfig {
    fn default() -> Self {
        Self {
            handle: DEFAULT_CONTEXTUAL_HANDLE.to_string(),
            trainable: true,
            signature: DEFAULT_SIGNATURE.to_string(),
            output_key: DEFAULT_OUTPUT_KEY.to_string(),
        }
    }
}

impl ContextualEmbeddingConfig {
    /// Default configuration with the given trainability.
    pub fn new(trainable: bool) -> Self {
        Self {
            trainable,
            ..Self::default()
        }
    }

    pub fn with_handle(mut self, handle: impl Into<String>) -> Self {
        self.handle = handle.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_trainable_elmo() {
        let config = ContextualEmbeddingConfig::default();
        assert!(config.trainable);
        assert_eq!(config.handle, "https://tfhub.dev/google/elmo/2");
        assert_eq!(config.signature, "tokens");
        assert_eq!(config.output_key, "elmo");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: ContextualEmbeddingConfig =
            serde_json::from_str(r#"{"trainable": false}"#).unwrap();
        assert!(!config.trainable);
        assert_eq!(config.output_key, "elmo");
    }
}
