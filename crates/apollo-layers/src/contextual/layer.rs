//! Contextual word-embedding layer.
//!
//! Wraps a pretrained contextual model (ELMo by default) and emits one
//! 1024-dimensional vector per token. The model is bound once, under a scope
//! derived from the layer name, so several instances in one model never share
//! variables.

use super::config::ContextualEmbeddingConfig;
use super::traits::{ContextualModel, ModelHub, ModelInputs};
use crate::config::CONTEXTUAL_EMBEDDING_DIM;
use crate::error::LayerError;
use crate::layer::Layer;
use crate::mask::MaskOutput;
use crate::tokens::TokenBatch;
use candle_core::{DType, Tensor, Var};
use candle_nn::VarMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Input to [`ContextualEmbeddingLayer::forward`].
#[derive(Debug, Clone)]
pub struct ContextualInputs {
    /// Padded `(batch, time)` tokens
    pub tokens: TokenBatch,
    /// Real-token counts, shape `(batch,)` or `(batch, 1)`, any numeric dtype
    pub sequence_lengths: Tensor,
}

impl ContextualInputs {
    pub fn new(tokens: TokenBatch, sequence_lengths: Tensor) -> Self {
        Self {
            tokens,
            sequence_lengths,
        }
    }
}

/// A bound model instance and the variables registered for it.
struct Binding {
    model: Arc<dyn ContextualModel>,
    variables: Vec<Var>,
}

/// Per-token contextual embeddings from a pretrained model.
///
/// # Examples
///
/// ```ignore
/// let layer = ContextualEmbeddingLayer::new("elmo", ContextualEmbeddingConfig::default());
/// layer.build(&hub, &var_map)?;
///
/// let tokens = TokenBatch::from_sequences(&[vec!["the", "cat"]], None);
/// let lengths = tokens.sequence_lengths(&Device::Cpu)?;
/// let inputs = ContextualInputs::new(tokens, lengths);
///
/// let vectors = layer.forward(&inputs, &MaskOutput::NoMask)?; // (1, 2, 1024)
/// let mask = layer.compute_mask(&inputs, &MaskOutput::NoMask)?;
/// ```
pub struct ContextualEmbeddingLayer {
    name: String,
    config: ContextualEmbeddingConfig,
    binding: OnceCell<Binding>,
}

impl ContextualEmbeddingLayer {
    pub fn new(name: impl Into<String>, config: ContextualEmbeddingConfig) -> Self {
        Self {
            name: name.into(),
            config,
            binding: OnceCell::new(),
        }
    }

    pub fn config(&self) -> &ContextualEmbeddingConfig {
        &self.config
    }

    /// Variable scope the bound model lives under.
    pub fn scope(&self) -> String {
        format!("{}_module", self.name)
    }

    pub fn is_built(&self) -> bool {
        self.binding.get().is_some()
    }

    /// Binds the model on first call; later calls are no-ops.
    ///
    /// When the layer is trainable, the model's variables are registered in
    /// `var_map` under `"{scope}/{variable}"`.
    ///
    /// # Errors
    ///
    /// - `LayerError::ResourceUnavailable` if the hub cannot load the model
    /// - `LayerError::InvalidConfig` if the model's output dimension is not 1024
    /// - `LayerError::DuplicateScope` if another layer already registered variables
    ///   under this scope
    pub fn build(&self, hub: &dyn ModelHub, var_map: &VarMap) -> Result<(), LayerError> {
        self.binding
            .get_or_try_init(|| self.bind(hub, var_map))
            .map(|_| ())
    }

    fn bind(&self, hub: &dyn ModelHub, var_map: &VarMap) -> Result<Binding, LayerError> {
        let scope = self.scope();
        info!(
            "Binding contextual model '{}' under scope '{}' (trainable: {})",
            self.config.handle, scope, self.config.trainable
        );

        let model = hub
            .load(&self.config.handle, &scope, self.config.trainable)
            .map_err(|e| match e {
                LayerError::ResourceUnavailable(_) => e,
                other => LayerError::ResourceUnavailable(format!(
                    "Failed to load '{}': {}",
                    self.config.handle, other
                )),
            })?;

        if model.output_dim() != CONTEXTUAL_EMBEDDING_DIM {
            return Err(LayerError::InvalidConfig(format!(
                "Contextual model '{}' produces {}-d vectors, expected {}",
                self.config.handle,
                model.output_dim(),
                CONTEXTUAL_EMBEDDING_DIM
            )));
        }

        let variables = if self.config.trainable {
            register_variables(var_map, &scope, model.variables())?
        } else {
            Vec::new()
        };

        Ok(Binding { model, variables })
    }
}

/// Adds `variables` to `var_map` under `scope`, refusing a scope already in use.
///
/// A scope is claimed only by the variables registered under it. Models that
/// expose no variables leave nothing to share, so they never conflict.
fn register_variables(
    var_map: &VarMap,
    scope: &str,
    variables: Vec<(String, Var)>,
) -> Result<Vec<Var>, LayerError> {
    let mut data = var_map
        .data()
        .lock()
        .map_err(|e| LayerError::LockPoisoned(e.to_string()))?;

    let prefix = format!("{}/", scope);
    if data.keys().any(|k| k.starts_with(&prefix)) {
        warn!("Variables already registered under scope '{}'", scope);
        return Err(LayerError::DuplicateScope(scope.to_string()));
    }

    let mut registered = Vec::with_capacity(variables.len());
    for (name, var) in variables {
        let key = format!("{}{}", prefix, name);
        debug!("Registering trainable variable '{}'", key);
        data.insert(key, var.clone());
        registered.push(var);
    }

    Ok(registered)
}

/// Flattens lengths to 1-D `i64` and checks each is a whole number in `0..=time`.
fn flatten_lengths(lengths: &Tensor, batch: usize, time: usize) -> Result<Tensor, LayerError> {
    let values = lengths.flatten_all()?.to_dtype(DType::F64)?.to_vec1::<f64>()?;

    if values.len() != batch {
        return Err(LayerError::ShapeMismatch(format!(
            "expected {} sequence lengths, got {}",
            batch,
            values.len()
        )));
    }

    if let Some((i, len)) = values
        .iter()
        .enumerate()
        .find(|&(_, &len)| len.fract() != 0.0 || len < 0.0 || len > time as f64)
    {
        return Err(LayerError::InvalidInput(format!(
            "sequence length {} of example {} is not a whole number in 0..={}",
            len, i, time
        )));
    }

    let whole: Vec<i64> = values.iter().map(|&len| len as i64).collect();
    Ok(Tensor::from_vec(whole, batch, lengths.device())?)
}

impl Layer for ContextualEmbeddingLayer {
    type Input = ContextualInputs;

    fn name(&self) -> &str {
        &self.name
    }

    fn compute_output_shape(&self, input_shape: &[usize]) -> Result<Vec<usize>, LayerError> {
        match input_shape {
            [batch, time, ..] => Ok(vec![*batch, *time, CONTEXTUAL_EMBEDDING_DIM]),
            _ => Err(LayerError::ShapeMismatch(format!(
                "token input must be at least (batch, time), got {:?}",
                input_shape
            ))),
        }
    }

    fn forward(&self, input: &ContextualInputs, _mask: &MaskOutput) -> Result<Tensor, LayerError> {
        let binding = self
            .binding
            .get()
            .ok_or_else(|| LayerError::NotBuilt(self.name.clone()))?;

        let (batch, time) = input.tokens.dims();
        let sequence_len = flatten_lengths(&input.sequence_lengths, batch, time)?;

        let mut outputs = binding.model.call(
            &self.config.signature,
            ModelInputs {
                tokens: &input.tokens,
                sequence_len: &sequence_len,
            },
        )?;

        let embeddings = outputs.remove(&self.config.output_key).ok_or_else(|| {
            LayerError::InvalidOutput(format!(
                "signature '{}' returned no '{}' output",
                self.config.signature, self.config.output_key
            ))
        })?;

        let expected = [batch, time, CONTEXTUAL_EMBEDDING_DIM];
        if embeddings.dims() != expected {
            return Err(LayerError::ShapeMismatch(format!(
                "contextual output is {:?}, expected {:?}",
                embeddings.dims(),
                expected
            )));
        }

        Ok(embeddings)
    }

    fn compute_mask(
        &self,
        input: &ContextualInputs,
        _mask: &MaskOutput,
    ) -> Result<MaskOutput, LayerError> {
        let device = input.sequence_lengths.device();
        Ok(MaskOutput::Mask(input.tokens.pad_mask(device)?))
    }

    fn trainable_variables(&self) -> Vec<Var> {
        self.binding
            .get()
            .map(|b| b.variables.clone())
            .unwrap_or_default()
    }
}
