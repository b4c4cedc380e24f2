//! Contextual word embeddings.
//!
//! ## Core Traits
//!
//! - [`ModelHub`] - Resolves a model handle to a loaded instance
//! - [`ContextualModel`] - The opaque pretrained model
//!
//! ## Layer
//!
//! - [`ContextualEmbeddingLayer`] - 1024-d per-token vectors with a pad-derived mask
//! - [`ContextualEmbeddingConfig`] - Handle, trainability, signature and output key

mod traits;

pub mod config;
pub mod layer;

pub use traits::{ContextualModel, ModelHub, ModelInputs, ModelOutputs};

pub use config::ContextualEmbeddingConfig;

pub use layer::{ContextualEmbeddingLayer, ContextualInputs};
