//! Validity masks and the mask-propagation result type.
//!
//! A [`Mask`] marks which `(batch, time)` positions hold real tokens. Layers
//! exchange masks through [`MaskOutput`], which makes "no mask" an explicit
//! case instead of an optional tensor.

use crate::error::LayerError;
use candle_core::{DType, Device, Tensor};

/// Boolean `(batch, time)` mask stored as a `u8` tensor (1 = real token).
#[derive(Clone, Debug)]
pub struct Mask {
    tensor: Tensor,
}

impl Mask {
    /// Wraps a rank-2 tensor. Any non-zero entry counts as valid.
    ///
    /// # Errors
    ///
    /// Returns `LayerError::ShapeMismatch` if the tensor is not rank 2.
    pub fn new(tensor: Tensor) -> Result<Self, LayerError> {
        if tensor.rank() != 2 {
            return Err(LayerError::ShapeMismatch(format!(
                "mask must be (batch, time), got {:?}",
                tensor.dims()
            )));
        }

        // Stored flags are always 0/1, whatever the input dtype or values
        let tensor = tensor.ne(&tensor.zeros_like()?)?;

        Ok(Self { tensor })
    }

    /// Builds a mask from per-example rows of flags.
    ///
    /// # Errors
    ///
    /// Returns `LayerError::ShapeMismatch` if the rows are ragged.
    pub fn from_rows(rows: &[Vec<bool>], device: &Device) -> Result<Self, LayerError> {
        let batch = rows.len();
        let time = rows.first().map(|r| r.len()).unwrap_or(0);

        if let Some(i) = rows.iter().position(|r| r.len() != time) {
            return Err(LayerError::ShapeMismatch(format!(
                "mask row {} has length {}, expected {}",
                i,
                rows[i].len(),
                time
            )));
        }

        let flat: Vec<u8> = rows.iter().flatten().map(|&v| u8::from(v)).collect();
        let tensor = Tensor::from_vec(flat, (batch, time), device)?;
        Ok(Self { tensor })
    }

    /// Returns the underlying `u8` tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Returns `(batch, time)`.
    pub fn dims(&self) -> (usize, usize) {
        let dims = self.tensor.dims();
        (dims[0], dims[1])
    }

    /// Copies the mask out as rows of flags.
    pub fn to_rows(&self) -> Result<Vec<Vec<bool>>, LayerError> {
        let rows = self.tensor.to_vec2::<u8>()?;
        Ok(rows
            .into_iter()
            .map(|row| row.into_iter().map(|v| v != 0).collect())
            .collect())
    }

    /// Number of valid positions per example.
    pub fn valid_counts(&self) -> Result<Vec<u32>, LayerError> {
        let counts = self.tensor.to_dtype(DType::U32)?.sum(1)?;
        Ok(counts.to_vec1::<u32>()?)
    }
}

/// Result of mask propagation through a layer.
#[derive(Clone, Debug, Default)]
pub enum MaskOutput {
    /// No positions are masked out downstream.
    #[default]
    NoMask,
    /// Downstream layers should honor this mask.
    Mask(Mask),
}

impl MaskOutput {
    /// Returns the mask, if any.
    pub fn as_mask(&self) -> Option<&Mask> {
        match self {
            MaskOutput::NoMask => None,
            MaskOutput::Mask(mask) => Some(mask),
        }
    }

    pub fn is_masked(&self) -> bool {
        matches!(self, MaskOutput::Mask(_))
    }
}

impl From<Mask> for MaskOutput {
    fn from(mask: Mask) -> Self {
        MaskOutput::Mask(mask)
    }
}

impl From<Option<Mask>> for MaskOutput {
    fn from(mask: Option<Mask>) -> Self {
        mask.map_or(MaskOutput::NoMask, MaskOutput::Mask)
    }
}
