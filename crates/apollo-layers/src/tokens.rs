//! Padded token batches.
//!
//! The contextual layer consumes strings padded with [`PAD_TOKEN`]; the static
//! lookup consumes `u32` indices padded with [`PAD_INDEX`]. Both are
//! right-padded to a common length.

use crate::config::{PAD_INDEX, PAD_TOKEN};
use crate::error::LayerError;
use crate::mask::Mask;
use candle_core::{Device, Tensor};

/// Rectangular `(batch, time)` grid of token strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenBatch {
    rows: Vec<Vec<String>>,
    time: usize,
}

impl TokenBatch {
    /// Wraps already padded rows.
    ///
    /// # Errors
    ///
    /// Returns `LayerError::ShapeMismatch` if the rows differ in length.
    pub fn new(rows: Vec<Vec<String>>) -> Result<Self, LayerError> {
        let time = rows.first().map(|r| r.len()).unwrap_or(0);
        if let Some(i) = rows.iter().position(|r| r.len() != time) {
            return Err(LayerError::ShapeMismatch(format!(
                "token row {} has length {}, expected {}",
                i,
                rows[i].len(),
                time
            )));
        }
        Ok(Self { rows, time })
    }

    /// Pads ragged sequences to a common length.
    ///
    /// The common length is `max_len` when given (longer sequences are
    /// truncated), otherwise the longest sequence.
    pub fn from_sequences<S: AsRef<str>>(sequences: &[Vec<S>], max_len: Option<usize>) -> Self {
        let longest = sequences.iter().map(|s| s.len()).max().unwrap_or(0);
        let time = max_len.unwrap_or(longest);

        let rows = sequences
            .iter()
            .map(|seq| {
                let mut row: Vec<String> = seq
                    .iter()
                    .take(time)
                    .map(|t| t.as_ref().to_string())
                    .collect();
                row.resize(time, PAD_TOKEN.to_string());
                row
            })
            .collect();

        Self { rows, time }
    }

    pub fn batch_size(&self) -> usize {
        self.rows.len()
    }

    pub fn time(&self) -> usize {
        self.time
    }

    /// Returns `(batch, time)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows.len(), self.time)
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Token at `(example, position)`.
    pub fn get(&self, example: usize, position: usize) -> Option<&str> {
        self.rows
            .get(example)
            .and_then(|row| row.get(position))
            .map(String::as_str)
    }

    /// Count of non-pad tokens per example as an `i64` tensor of shape `(batch,)`.
    pub fn sequence_lengths(&self, device: &Device) -> Result<Tensor, LayerError> {
        let lengths: Vec<i64> = self
            .rows
            .iter()
            .map(|row| row.iter().filter(|t| t.as_str() != PAD_TOKEN).count() as i64)
            .collect();
        let batch = lengths.len();
        Ok(Tensor::from_vec(lengths, batch, device)?)
    }

    /// Mask that is true wherever the token is not [`PAD_TOKEN`].
    pub fn pad_mask(&self, device: &Device) -> Result<Mask, LayerError> {
        let flags: Vec<Vec<bool>> = self
            .rows
            .iter()
            .map(|row| row.iter().map(|t| t.as_str() != PAD_TOKEN).collect())
            .collect();

        if flags.is_empty() {
            let tensor = Tensor::zeros((0, self.time), candle_core::DType::U8, device)?;
            return Mask::new(tensor);
        }
        Mask::from_rows(&flags, device)
    }
}

/// Right-pads ragged index sequences with [`PAD_INDEX`] into a `(batch, time)` `u32` tensor.
pub fn pad_indices(rows: &[Vec<u32>], device: &Device) -> Result<Tensor, LayerError> {
    let batch = rows.len();
    let time = rows.iter().map(|r| r.len()).max().unwrap_or(0);

    let mut flat = Vec::with_capacity(batch * time);
    for row in rows {
        flat.extend_from_slice(row);
        flat.extend(std::iter::repeat(PAD_INDEX).take(time - row.len()));
    }

    Ok(Tensor::from_vec(flat, (batch, time), device)?)
}
