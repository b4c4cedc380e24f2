//! Traits for binding the pretrained contextual model.
//!
//! The contextual model itself is opaque: the layer only needs to load an
//! instance under a scope, list its variables, and call a named signature.
//! These traits let a hub client, a local checkpoint, or a test double stand
//! in for the model without changing the layer.

use crate::error::LayerError;
use crate::tokens::TokenBatch;
use candle_core::{Tensor, Var};
use std::collections::HashMap;
use std::sync::Arc;

/// Named outputs returned by a model signature.
pub type ModelOutputs = HashMap<String, Tensor>;

/// Inputs to the model's token-mode signature.
#[derive(Debug, Clone, Copy)]
pub struct ModelInputs<'a> {
    /// Padded `(batch, time)` token strings
    pub tokens: &'a TokenBatch,
    /// 1-D `i64` tensor of real-token counts, one per example
    pub sequence_len: &'a Tensor,
}

/// Resolves a model handle to a loaded model instance.
///
/// # Examples
///
/// ```ignore
/// struct LocalHub { root: PathBuf }
///
/// impl ModelHub for LocalHub {
///     fn load(&self, handle: &str, scope: &str, trainable: bool)
///         -> Result<Arc<dyn ContextualModel>, LayerError> {
///         let model = ElmoCheckpoint::open(self.root.join(slug(handle)), scope, trainable)
///             .map_err(|e| LayerError::ResourceUnavailable(e.to_string()))?;
///         Ok(Arc::new(model))
///     }
/// }
/// ```
pub trait ModelHub: Send + Sync {
    /// Loads one model instance whose variables live under `scope`.
    ///
    /// # Errors
    ///
    /// Implementations should return `LayerError::ResourceUnavailable` when
    /// the handle cannot be resolved.
    fn load(
        &self,
        handle: &str,
        scope: &str,
        trainable: bool,
    ) -> Result<Arc<dyn ContextualModel>, LayerError>;
}

/// A loaded contextual embedding model.
pub trait ContextualModel: Send + Sync {
    /// Dimension of the per-token vectors the model produces.
    fn output_dim(&self) -> usize;

    /// The model's internal variables, keyed by name relative to its scope.
    fn variables(&self) -> Vec<(String, Var)>;

    /// Invokes a named signature.
    fn call(&self, signature: &str, inputs: ModelInputs<'_>) -> Result<ModelOutputs, LayerError>;
}
