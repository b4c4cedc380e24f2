//! Static word-vector lookup layer.
//!
//! A frozen index-to-vector lookup over a pretrained GloVe table. Tables are
//! shared through an [`EmbeddingTableCache`] so any number of lookups for the
//! same dimension reuse one matrix.

use super::cache::EmbeddingTableCache;
use super::loader::{EmbeddingTable, NpyTableLoader, TableLoader};
use crate::config::SUPPORTED_STATIC_DIMS;
use crate::error::LayerError;
use crate::layer::Layer;
use crate::mask::{Mask, MaskOutput};
use candle_core::{DType, Module, Tensor};
use candle_nn::Embedding;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Configuration for [`StaticEmbeddingLookup`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEmbeddingConfig {
    /// Embedding dimension; one of [`SUPPORTED_STATIC_DIMS`]
    pub dimension: usize,

    /// Table location with a single `%d` placeholder for the dimension
    pub path_template: String,

    /// Treat index 0 as padding in the propagated mask
    #[serde(default)]
    pub mask_zero: bool,
}

impl StaticEmbeddingConfig {
    pub fn new(dimension: usize, path_template: impl Into<String>) -> Self {
        Self {
            dimension,
            path_template: path_template.into(),
            mask_zero: false,
        }
    }

    pub fn with_mask_zero(mut self, mask_zero: bool) -> Self {
        self.mask_zero = mask_zero;
        self
    }
}

/// Frozen lookup of pretrained word vectors.
pub struct StaticEmbeddingLookup {
    name: String,
    table: Arc<EmbeddingTable>,
    embedding: Embedding,
    mask_zero: bool,
}

impl StaticEmbeddingLookup {
    /// Creates a lookup whose table is read from `config.path_template`.
    ///
    /// # Errors
    ///
    /// - `LayerError::ResourceNotFound` for an unsupported dimension or a missing file
    /// - `LayerError::InvalidConfig` for a malformed template or table
    pub fn new(
        config: &StaticEmbeddingConfig,
        cache: &EmbeddingTableCache,
    ) -> Result<Self, LayerError> {
        check_dimension(config.dimension)?;
        let loader = NpyTableLoader::new(config.path_template.as_str())?;
        Self::with_loader(config, cache, &loader)
    }

    /// Creates a lookup whose table comes from a custom loader.
    pub fn with_loader(
        config: &StaticEmbeddingConfig,
        cache: &EmbeddingTableCache,
        loader: &dyn TableLoader,
    ) -> Result<Self, LayerError> {
        check_dimension(config.dimension)?;
        let table = cache.get_or_load(config.dimension, loader)?;
        let embedding = Embedding::new(table.weights().clone(), table.dimension());
        let name = format!("glove{}_embeddings", config.dimension);

        debug!(
            "Created '{}' over {} words (mask_zero: {})",
            name,
            table.vocab_size(),
            config.mask_zero
        );

        Ok(Self {
            name,
            table,
            embedding,
            mask_zero: config.mask_zero,
        })
    }

    pub fn vocab_size(&self) -> usize {
        self.table.vocab_size()
    }

    pub fn embedding_dim(&self) -> usize {
        self.table.dimension()
    }

    pub fn mask_zero(&self) -> bool {
        self.mask_zero
    }

    /// The shared table backing this lookup.
    pub fn table(&self) -> &Arc<EmbeddingTable> {
        &self.table
    }

    /// Casts indices to `u32` after checking every index is in the vocabulary.
    fn checked_indices(&self, indices: &Tensor) -> Result<Tensor, LayerError> {
        let values = indices.flatten_all()?.to_dtype(DType::I64)?.to_vec1::<i64>()?;
        let vocab_size = self.vocab_size() as i64;

        if let Some(&bad) = values.iter().find(|&&v| v < 0 || v >= vocab_size) {
            return Err(LayerError::InvalidInput(format!(
                "token index {} outside vocabulary of {}",
                bad, vocab_size
            )));
        }

        Ok(indices.to_dtype(DType::U32)?)
    }
}

fn check_dimension(dimension: usize) -> Result<(), LayerError> {
    if SUPPORTED_STATIC_DIMS.contains(&dimension) {
        Ok(())
    } else {
        Err(LayerError::ResourceNotFound(format!(
            "no pretrained table for dimension {} (supported: {:?})",
            dimension, SUPPORTED_STATIC_DIMS
        )))
    }
}

impl Layer for StaticEmbeddingLookup {
    type Input = Tensor;

    fn name(&self) -> &str {
        &self.name
    }

    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, LayerError> {
        if input_shape.is_empty() {
            return Err(LayerError::ShapeMismatch(
                "index input must have at least one axis".to_string(),
            ));
        }
        let mut shape = input_shape.to_vec();
        shape.push(self.embedding_dim());
        Ok(shape)
    }

    fn forward(&self, indices: &Tensor, _mask: &MaskOutput) -> Result<Tensor, LayerError> {
        let indices = self.checked_indices(indices)?;
        Ok(self.embedding.forward(&indices)?)
    }

    fn compute_mask(&self, indices: &Tensor, _mask: &MaskOutput) -> Result<MaskOutput, LayerError> {
        if !self.mask_zero {
            return Ok(MaskOutput::NoMask);
        }
        let valid = indices.ne(&indices.zeros_like()?)?;
        Ok(MaskOutput::Mask(Mask::new(valid)?))
    }
}
