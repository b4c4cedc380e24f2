//! The layer composition interface.
//!
//! Every layer in this crate implements [`Layer`], which is what an external
//! model builder consumes: shape inference, the forward computation, and mask
//! propagation. Inputs differ per layer (token strings, index tensors, dense
//! tensors), so the input type is associated rather than fixed.
//!
//! # Examples
//!
//! ```ignore
//! let mask = lookup.compute_mask(&indices, &MaskOutput::NoMask)?;
//! let embedded = lookup.forward(&indices, &MaskOutput::NoMask)?;
//! let pooled = pool.forward(&embedded, &mask)?;
//! assert!(!pool.compute_mask(&embedded, &mask)?.is_masked());
//! ```

use crate::error::LayerError;
use crate::mask::MaskOutput;
use candle_core::{Tensor, Var};

/// A composable layer with explicit shape inference and mask propagation.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` so a built model can be shared
/// across worker threads.
pub trait Layer: Send + Sync {
    /// What `forward` and `compute_mask` consume.
    type Input: ?Sized;

    /// Layer name, unique within a model.
    fn name(&self) -> &str;

    /// Whether the layer honors an incoming mask.
    fn supports_masking(&self) -> bool {
        false
    }

    /// Maps an input shape to the output shape without running the layer.
    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, LayerError>;

    /// Runs the layer.
    fn forward(&self, input: &Self::Input, mask: &MaskOutput) -> Result<Tensor, LayerError>;

    /// Mask handed to the next layer.
    fn compute_mask(&self, input: &Self::Input, mask: &MaskOutput)
        -> Result<MaskOutput, LayerError>;

    /// Variables this layer contributes to the trainable set.
    fn trainable_variables(&self) -> Vec<Var> {
        Vec::new()
    }
}
