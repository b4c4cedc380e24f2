//! # Apollo Layers
//!
//! Embedding and pooling layers for sequence models, built on Candle.
//!
//! Each layer is an independent leaf that an external model builder composes
//! through the [`Layer`] trait: shape inference, a forward computation, and
//! explicit mask propagation via [`MaskOutput`].
//!
//! ## Modules
//!
//! - [`contextual`] - Contextual word embeddings from a pretrained model (ELMo)
//! - [`glove`] - Frozen pretrained word vectors with a load-once table cache
//! - [`pooling`] - Masked mean pooling over the time axis
//! - [`layer`] - The composition interface
//! - [`mask`] - Validity masks and the mask-propagation result type
//! - [`tokens`] - Padded token and index batches
//! - [`config`] - Dimensions, handles and pad markers
//! - [`error`] - Error type shared by all layers

pub mod config;
pub mod contextual;
pub mod error;
pub mod glove;
pub mod layer;
pub mod mask;
pub mod pooling;
pub mod tokens;

pub use contextual::{
    ContextualEmbeddingConfig, ContextualEmbeddingLayer, ContextualInputs, ContextualModel,
    ModelHub,
};
pub use error::LayerError;
pub use glove::{
    global_table_cache, EmbeddingTableCache, StaticEmbeddingConfig, StaticEmbeddingLookup,
};
pub use layer::Layer;
pub use mask::{Mask, MaskOutput};
pub use pooling::{EmptySequencePolicy, MaskedMeanPool};
pub use tokens::{pad_indices, TokenBatch};
