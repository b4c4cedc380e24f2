//! Layer configuration constants.
//!
//! Fixed values shared by the layers, the CLI and the benchmarks.
//!
//! # Usage
//!
//! ```
//! use apollo_layers::config::{CONTEXTUAL_EMBEDDING_DIM, PAD_TOKEN};
//!
//! let placeholder = vec![0.0f32; CONTEXTUAL_EMBEDDING_DIM];
//! assert_eq!(placeholder.len(), 1024);
//! assert_eq!(PAD_TOKEN, "--PAD--");
//! ```

// =============================================================================
// Contextual Embedding Configuration
// =============================================================================

/// Output dimension of the contextual embedding layer.
///
/// ELMo emits a 1024-dimensional vector per token.
pub const CONTEXTUAL_EMBEDDING_DIM: usize = 1024;

/// Remote identifier of the pretrained contextual model.
pub const DEFAULT_CONTEXTUAL_HANDLE: &str = "https://tfhub.dev/google/elmo/2";

/// Model signature that accepts pre-tokenized input.
pub const DEFAULT_SIGNATURE: &str = "tokens";

/// Name of the per-token output in the model's output map.
pub const DEFAULT_OUTPUT_KEY: &str = "elmo";

// =============================================================================
// Padding Conventions
// =============================================================================

/// Pad marker for token-string sequences.
pub const PAD_TOKEN: &str = "--PAD--";

/// Pad marker for token-index sequences when `mask_zero` is enabled.
pub const PAD_INDEX: u32 = 0;

// =============================================================================
// Static Embedding Configuration
// =============================================================================

/// Dimensions for which pretrained GloVe tables are published.
pub const SUPPORTED_STATIC_DIMS: [usize; 4] = [50, 100, 200, 300];

/// Placeholder substituted with the dimension in a static table path template.
pub const DIMENSION_PLACEHOLDER: &str = "%d";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_dims_are_sorted_and_unique() {
        let dims = SUPPORTED_STATIC_DIMS;
        assert!(dims.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_pad_index_is_zero() {
        assert_eq!(PAD_INDEX, 0);
    }
}
