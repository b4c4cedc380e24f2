//! Masked mean pooling over the time axis.
//!
//! Collapses `(batch, time, dim)` into `(batch, dim)` by averaging the valid
//! positions of each example. The mask is consumed here and never propagated,
//! since the time axis is gone after pooling.

use crate::error::LayerError;
use crate::layer::Layer;
use crate::mask::MaskOutput;
use candle_core::{DType, Tensor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What masked pooling yields for an example with no valid positions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySequencePolicy {
    /// Clamp the divisor to 1, producing the zero vector
    #[default]
    Zero,
    /// Divide by zero as-is, producing NaN
    Nan,
    /// Fail with `LayerError::EmptySequence`
    Error,
}

impl fmt::Display for EmptySequencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmptySequencePolicy::Zero => write!(f, "zero"),
            EmptySequencePolicy::Nan => write!(f, "nan"),
            EmptySequencePolicy::Error => write!(f, "error"),
        }
    }
}

impl FromStr for EmptySequencePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "zero" => Ok(EmptySequencePolicy::Zero),
            "nan" => Ok(EmptySequencePolicy::Nan),
            "error" => Ok(EmptySequencePolicy::Error),
            other => Err(format!(
                "unknown empty-sequence policy '{}' (expected zero, nan or error)",
                other
            )),
        }
    }
}

/// Parameter-free mean pooling that honors an incoming mask.
#[derive(Clone, Debug)]
pub struct MaskedMeanPool {
    name: String,
    policy: EmptySequencePolicy,
}

impl Default for MaskedMeanPool {
    fn default() -> Self {
        Self::new("mean_pool")
    }
}

impl MaskedMeanPool {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            policy: EmptySequencePolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EmptySequencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> EmptySequencePolicy {
        self.policy
    }

    /// Per-example count of valid positions as `(batch, 1)`, adjusted by the policy.
    fn divisor(&self, weights: &Tensor) -> Result<Tensor, LayerError> {
        let counts = weights.sum_keepdim(1)?;
        match self.policy {
            EmptySequencePolicy::Zero => Ok(counts.maximum(&counts.ones_like()?)?),
            EmptySequencePolicy::Nan => Ok(counts),
            EmptySequencePolicy::Error => {
                let values = counts.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
                match values.iter().position(|&c| c == 0.0) {
                    Some(example) => Err(LayerError::EmptySequence { example }),
                    None => Ok(counts),
                }
            }
        }
    }
}

impl Layer for MaskedMeanPool {
    type Input = Tensor;

    fn name(&self) -> &str {
        &self.name
    }

    fn supports_masking(&self) -> bool {
        true
    }

    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, LayerError> {
        match input_shape {
            [batch, _time, dim] => Ok(vec![*batch, *dim]),
            _ => Err(LayerError::ShapeMismatch(format!(
                "pooling input must be (batch, time, dim), got {:?}",
                input_shape
            ))),
        }
    }

    fn forward(&self, x: &Tensor, mask: &MaskOutput) -> Result<Tensor, LayerError> {
        let (batch, time, _dim) = x.dims3().map_err(|_| {
            LayerError::ShapeMismatch(format!(
                "pooling input must be (batch, time, dim), got {:?}",
                x.dims()
            ))
        })?;

        let mask = match mask {
            MaskOutput::NoMask => return Ok(x.mean(1)?),
            MaskOutput::Mask(mask) => mask,
        };

        if mask.dims() != (batch, time) {
            return Err(LayerError::ShapeMismatch(format!(
                "mask is {:?}, expected {:?}",
                mask.dims(),
                (batch, time)
            )));
        }

        // (batch, time) -> (batch, time, 1), broadcast over dim
        let weights = mask.tensor().to_dtype(x.dtype())?;
        let summed = x.broadcast_mul(&weights.unsqueeze(2)?)?.sum(1)?;
        let divisor = self.divisor(&weights)?;

        Ok(summed.broadcast_div(&divisor)?)
    }

    fn compute_mask(&self, _x: &Tensor, _mask: &MaskOutput) -> Result<MaskOutput, LayerError> {
        Ok(MaskOutput::NoMask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Mask;
    use candle_core::Device;

    fn single_example() -> Tensor {
        Tensor::new(&[[[1f32, 1.0], [2.0, 2.0], [3.0, 3.0]]], &Device::Cpu).unwrap()
    }

    fn mask(rows: &[Vec<bool>]) -> MaskOutput {
        MaskOutput::Mask(Mask::from_rows(rows, &Device::Cpu).unwrap())
    }

    #[test]
    fn test_masked_mean_ignores_padding() {
        let pool = MaskedMeanPool::default();
        let output = pool
            .forward(&single_example(), &mask(&[vec![true, true, false]]))
            .unwrap();
        assert_eq!(output.to_vec2::<f32>().unwrap(), vec![vec![1.5, 1.5]]);
    }

    #[test]
    fn test_non_binary_mask_weights_positions_equally() {
        let pool = MaskedMeanPool::default();
        let raw = Tensor::new(&[[2u8, 1, 0]], &Device::Cpu).unwrap();
        let mask = MaskOutput::Mask(Mask::new(raw).unwrap());

        let output = pool.forward(&single_example(), &mask).unwrap();
        assert_eq!(output.to_vec2::<f32>().unwrap(), vec![vec![1.5, 1.5]]);
    }

    #[test]
    fn test_unmasked_mean_averages_time() {
        let pool = MaskedMeanPool::default();
        let output = pool.forward(&single_example(), &MaskOutput::NoMask).unwrap();
        assert_eq!(output.to_vec2::<f32>().unwrap(), vec![vec![2.0, 2.0]]);
    }

    #[test]
    fn test_all_true_mask_matches_unmasked_mean() {
        let pool = MaskedMeanPool::default();
        let x = Tensor::new(
            &[
                [[0.5f32, -1.0, 2.0], [1.5, 3.0, 0.0]],
                [[4.0, 4.0, 4.0], [-2.0, 0.25, 1.0]],
            ],
            &Device::Cpu,
        )
        .unwrap();

        let masked = pool
            .forward(&x, &mask(&[vec![true, true], vec![true, true]]))
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();
        let unmasked = pool
            .forward(&x, &MaskOutput::NoMask)
            .unwrap()
            .to_vec2::<f32>()
            .unwrap();

        for (a, b) in masked.iter().flatten().zip(unmasked.iter().flatten()) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_each_example_uses_its_own_count() {
        let pool = MaskedMeanPool::default();
        let x = Tensor::new(
            &[[[2f32], [4.0], [6.0]], [[10.0], [20.0], [30.0]]],
            &Device::Cpu,
        )
        .unwrap();
        let output = pool
            .forward(&x, &mask(&[vec![true, false, false], vec![true, true, true]]))
            .unwrap();
        assert_eq!(output.to_vec2::<f32>().unwrap(), vec![vec![2.0], vec![20.0]]);
    }

    #[test]
    fn test_empty_sequence_zero_policy() {
        let pool = MaskedMeanPool::default();
        let output = pool
            .forward(&single_example(), &mask(&[vec![false, false, false]]))
            .unwrap();
        assert_eq!(output.to_vec2::<f32>().unwrap(), vec![vec![0.0, 0.0]]);
    }

    #[test]
    fn test_empty_sequence_nan_policy() {
        let pool = MaskedMeanPool::default().with_policy(EmptySequencePolicy::Nan);
        let output = pool
            .forward(&single_example(), &mask(&[vec![false, false, false]]))
            .unwrap();
        assert!(output.to_vec2::<f32>().unwrap()[0].iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_empty_sequence_error_policy_names_example() {
        let pool = MaskedMeanPool::default().with_policy(EmptySequencePolicy::Error);
        let x = Tensor::zeros((2, 2, 3), DType::F32, &Device::Cpu).unwrap();
        let result = pool.forward(&x, &mask(&[vec![true, false], vec![false, false]]));
        assert!(matches!(
            result,
            Err(LayerError::EmptySequence { example: 1 })
        ));
    }

    #[test]
    fn test_mask_shape_must_match_input() {
        let pool = MaskedMeanPool::default();
        let result = pool.forward(&single_example(), &mask(&[vec![true, true]]));
        assert!(matches!(result, Err(LayerError::ShapeMismatch(_))));
    }

    #[test]
    fn test_mask_is_never_propagated() {
        let pool = MaskedMeanPool::default();
        assert!(pool.supports_masking());
        let propagated = pool
            .compute_mask(&single_example(), &mask(&[vec![true, true, false]]))
            .unwrap();
        assert!(!propagated.is_masked());
    }

    #[test]
    fn test_compute_output_shape_drops_time() {
        let pool = MaskedMeanPool::default();
        assert_eq!(pool.compute_output_shape(&[8, 20, 300]).unwrap(), vec![8, 300]);
        assert!(pool.compute_output_shape(&[8, 300]).is_err());
    }

    #[test]
    fn test_policy_parses_from_str() {
        assert_eq!("NaN".parse::<EmptySequencePolicy>(), Ok(EmptySequencePolicy::Nan));
        assert_eq!(EmptySequencePolicy::Error.to_string(), "error");
        assert!("clamp".parse::<EmptySequencePolicy>().is_err());
    }
}
