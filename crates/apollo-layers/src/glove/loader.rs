//! Loading pretrained static embedding tables from disk.

use crate::config::DIMENSION_PLACEHOLDER;
use crate::error::LayerError;
use candle_core::{DType, Device, Tensor};
use std::path::PathBuf;
use tracing::info;

/// Immutable `(vocab_size, dimension)` embedding matrix.
#[derive(Debug)]
pub struct EmbeddingTable {
    dimension: usize,
    weights: Tensor,
}

impl EmbeddingTable {
    /// Wraps a loaded matrix, detached from any gradient graph.
    ///
    /// # Errors
    ///
    /// Returns `LayerError::InvalidConfig` if the matrix is not rank 2 or its
    /// second axis differs from `dimension`.
    pub fn new(dimension: usize, weights: Tensor) -> Result<Self, LayerError> {
        let (_vocab_size, cols) = weights.dims2().map_err(|_| {
            LayerError::InvalidConfig(format!(
                "embedding table must be (vocab, dim), got {:?}",
                weights.dims()
            ))
        })?;

        if cols != dimension {
            return Err(LayerError::InvalidConfig(format!(
                "embedding table has {} columns, expected {}",
                cols, dimension
            )));
        }

        Ok(Self {
            dimension,
            weights: weights.detach(),
        })
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn vocab_size(&self) -> usize {
        self.weights.dims()[0]
    }

    pub fn weights(&self) -> &Tensor {
        &self.weights
    }

    /// Copies out a single row.
    pub fn row(&self, index: usize) -> Result<Vec<f32>, LayerError> {
        if index >= self.vocab_size() {
            return Err(LayerError::InvalidInput(format!(
                "row {} out of range for vocabulary of {}",
                index,
                self.vocab_size()
            )));
        }
        Ok(self.weights.get(index)?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

/// Source of embedding matrices keyed by dimension.
pub trait TableLoader: Send + Sync {
    /// Loads the raw `(vocab_size, dimension)` matrix.
    fn load(&self, dimension: usize) -> Result<Tensor, LayerError>;
}

/// Loads `.npy` matrices from a path template such as `glove/glove.%d.npy`.
#[derive(Clone, Debug)]
pub struct NpyTableLoader {
    path_template: String,
    device: Device,
}

impl NpyTableLoader {
    /// # Errors
    ///
    /// Returns `LayerError::InvalidConfig` unless the template contains exactly
    /// one `%d` placeholder.
    pub fn new(path_template: impl Into<String>) -> Result<Self, LayerError> {
        let path_template = path_template.into();
        let placeholders = path_template.matches(DIMENSION_PLACEHOLDER).count();
        if placeholders != 1 {
            return Err(LayerError::InvalidConfig(format!(
                "path template '{}' must contain exactly one '{}' placeholder, found {}",
                path_template, DIMENSION_PLACEHOLDER, placeholders
            )));
        }

        Ok(Self {
            path_template,
            device: Device::Cpu,
        })
    }

    /// Places loaded tables on `device` instead of the CPU.
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// Substitutes `dimension` into the template.
    pub fn resolve(&self, dimension: usize) -> PathBuf {
        PathBuf::from(
            self.path_template
                .replace(DIMENSION_PLACEHOLDER, &dimension.to_string()),
        )
    }
}

impl TableLoader for NpyTableLoader {
    fn load(&self, dimension: usize) -> Result<Tensor, LayerError> {
        let path = self.resolve(dimension);
        if !path.is_file() {
            return Err(LayerError::ResourceNotFound(format!(
                "no embedding table at {}",
                path.display()
            )));
        }

        info!("Reading embedding table from {}", path.display());
        let weights = Tensor::read_npy(&path).map_err(|e| {
            LayerError::InvalidConfig(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(weights.to_dtype(DType::F32)?.to_device(&self.device)?)
    }
}
