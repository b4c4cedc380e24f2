//! Error types for apollo-layers.
//!
//! Every layer operation returns [`LayerError`]. Resource failures happen at
//! construction or build time and are never retried; shape and input errors
//! surface from `forward` and `compute_mask`.

use thiserror::Error;

/// Errors that can occur while building or running a layer.
#[derive(Debug, Clone, Error)]
pub enum LayerError {
    /// The pretrained contextual model could not be bound
    #[error("Resource unavailable: {0}")]
    ResourceUnavailable(String),
    /// A static embedding file is missing or the dimension is unsupported
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),
    /// Invalid layer or loader configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    /// Input values violate the layer contract
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The wrapped model returned something the layer cannot use
    #[error("Invalid model output: {0}")]
    InvalidOutput(String),
    /// Tensor or mask shapes do not line up
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Trainable variables already registered under this scope
    #[error("Variable scope already registered: {0}")]
    DuplicateScope(String),
    /// `forward` called before `build`
    #[error("Layer '{0}' has not been built")]
    NotBuilt(String),
    /// Masked pooling over an example with no valid positions
    #[error("Example {example} has no valid positions to pool")]
    EmptySequence { example: usize },
    /// Underlying tensor operation failed
    #[error("Tensor operation failed: {0}")]
    Tensor(String),
    /// A shared lock was poisoned by a panicking thread
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

// Conversion implementations for error chaining

impl From<candle_core::Error> for LayerError {
    fn from(err: candle_core::Error) -> Self {
        LayerError::Tensor(err.to_string())
    }
}

impl From<LayerError> for String {
    fn from(err: LayerError) -> String {
        err.to_string()
    }
}
