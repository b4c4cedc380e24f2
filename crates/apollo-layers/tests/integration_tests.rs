//! End-to-end tests composing layers the way a model builder would.
//!
//! 1. Static: index batch -> GloVe lookup -> mask propagation -> masked mean pool
//! 2. Contextual: token batch -> contextual layer (fake hub) -> masked mean pool
//!
//! Static tables are written to a temporary directory as `.npy` files, so no
//! downloaded assets are required.

use apollo_layers::config::{CONTEXTUAL_EMBEDDING_DIM, PAD_TOKEN};
use apollo_layers::contextual::{ModelInputs, ModelOutputs};
use apollo_layers::{
    pad_indices, ContextualEmbeddingConfig, ContextualEmbeddingLayer, ContextualInputs,
    ContextualModel, EmbeddingTableCache, Layer, LayerError, MaskOutput, MaskedMeanPool, ModelHub,
    StaticEmbeddingConfig, StaticEmbeddingLookup, TokenBatch,
};
use candle_core::{DType, Device, Tensor, Var};
use candle_nn::VarMap;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// Fixtures
// ============================================================================

/// Writes a `(vocab_size, dimension)` table whose row `i` is filled with `i`.
fn write_table(dir: &Path, dimension: usize, vocab_size: usize) {
    let flat: Vec<f32> = (0..vocab_size)
        .flat_map(|i| std::iter::repeat(i as f32).take(dimension))
        .collect();
    let table = Tensor::from_vec(flat, (vocab_size, dimension), &Device::Cpu).unwrap();
    table
        .write_npy(dir.join(format!("glove.{}.npy", dimension)))
        .unwrap();
}

fn template(dir: &Path) -> String {
    dir.join("glove.%d.npy").to_string_lossy().into_owned()
}

/// Every token's vector is its position in the sequence plus one.
struct PositionModel;

impl ContextualModel for PositionModel {
    fn output_dim(&self) -> usize {
        CONTEXTUAL_EMBEDDING_DIM
    }

    fn variables(&self) -> Vec<(String, Var)> {
        let var = Var::zeros(4, DType::F32, &Device::Cpu).unwrap();
        vec![("lstm/kernel".to_string(), var)]
    }

    fn call(&self, _signature: &str, inputs: ModelInputs<'_>) -> Result<ModelOutputs, LayerError> {
        let (batch, time) = inputs.tokens.dims();
        let positions: Vec<f32> = (0..batch)
            .flat_map(|_| (0..time).map(|t| t as f32 + 1.0))
            .collect();
        let tensor = Tensor::from_vec(positions, (batch, time, 1), &Device::Cpu)?
            .broadcast_as((batch, time, CONTEXTUAL_EMBEDDING_DIM))?
            .contiguous()?;
        Ok(ModelOutputs::from([("elmo".to_string(), tensor)]))
    }
}

struct LocalHub;

impl ModelHub for LocalHub {
    fn load(
        &self,
        _handle: &str,
        _scope: &str,
        _trainable: bool,
    ) -> Result<Arc<dyn ContextualModel>, LayerError> {
        Ok(Arc::new(PositionModel))
    }
}

// ============================================================================
// Static embedding pipeline
// ============================================================================

#[test]
fn test_glove_lookup_then_masked_pool() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), 50, 10);

    let cache = EmbeddingTableCache::new();
    let config = StaticEmbeddingConfig::new(50, template(dir.path())).with_mask_zero(true);
    let lookup = StaticEmbeddingLookup::new(&config, &cache).unwrap();
    let pool = MaskedMeanPool::default();

    let indices = pad_indices(&[vec![2, 4], vec![9, 3, 6]], &Device::Cpu).unwrap();

    let mask = lookup.compute_mask(&indices, &MaskOutput::NoMask).unwrap();
    let embedded = lookup.forward(&indices, &MaskOutput::NoMask).unwrap();
    let pooled = pool.forward(&embedded, &mask).unwrap();

    assert_eq!(
        pool.compute_output_shape(embedded.dims()).unwrap(),
        pooled.dims().to_vec()
    );

    let values = pooled.to_vec2::<f32>().unwrap();
    assert!(values[0].iter().all(|&v| (v - 3.0).abs() < 1e-6));
    assert!(values[1].iter().all(|&v| (v - 6.0).abs() < 1e-6));
    assert!(!pool.compute_mask(&embedded, &mask).unwrap().is_masked());
}

#[test]
fn test_same_dimension_is_loaded_once_across_lookups() {
    let dir = tempfile::tempdir().unwrap();
    write_table(dir.path(), 100, 5);

    let cache = EmbeddingTableCache::new();
    let config = StaticEmbeddingConfig::new(100, template(dir.path()));

    let first = StaticEmbeddingLookup::new(&config, &cache).unwrap();
    let second = StaticEmbeddingLookup::new(&config.clone().with_mask_zero(true), &cache).unwrap();

    assert!(Arc::ptr_eq(first.table(), second.table()));
    assert_eq!(cache.load_count(), 1);
    assert_eq!(first.vocab_size(), 5);
    assert_eq!(first.embedding_dim(), 100);
}

#[test]
fn test_missing_table_file_fails_at_construction() {
    let dir = tempfile::tempdir().unwrap();
    let cache = EmbeddingTableCache::new();
    let config = StaticEmbeddingConfig::new(200, template(dir.path()));

    assert!(matches!(
        StaticEmbeddingLookup::new(&config, &cache),
        Err(LayerError::ResourceNotFound(_))
    ));
}

#[test]
fn test_config_deserializes_without_mask_zero() {
    let config: StaticEmbeddingConfig =
        serde_json::from_str(r#"{"dimension": 300, "path_template": "glove.%d.npy"}"#).unwrap();
    assert_eq!(config.dimension, 300);
    assert!(!config.mask_zero);
}

// ============================================================================
// Contextual embedding pipeline
// ============================================================================

#[test]
fn test_contextual_layer_then_masked_pool() {
    let var_map = VarMap::new();
    let layer = ContextualEmbeddingLayer::new("elmo", ContextualEmbeddingConfig::default());
    layer.build(&LocalHub, &var_map).unwrap();

    let tokens = TokenBatch::from_sequences(
        &[vec!["the", "cat", "sat"], vec!["hello", PAD_TOKEN, PAD_TOKEN]],
        None,
    );
    let lengths = tokens.sequence_lengths(&Device::Cpu).unwrap();
    let inputs = ContextualInputs::new(tokens, lengths);

    let mask = layer.compute_mask(&inputs, &MaskOutput::NoMask).unwrap();
    let embedded = layer.forward(&inputs, &MaskOutput::NoMask).unwrap();
    assert_eq!(
        layer.compute_output_shape(&[2, 3]).unwrap(),
        embedded.dims().to_vec()
    );

    let pooled = MaskedMeanPool::default().forward(&embedded, &mask).unwrap();
    let values = pooled.to_vec2::<f32>().unwrap();

    assert_eq!(values[0].len(), CONTEXTUAL_EMBEDDING_DIM);
    assert!(values[0].iter().all(|&v| (v - 2.0).abs() < 1e-6));
    assert!(values[1].iter().all(|&v| (v - 1.0).abs() < 1e-6));
}

#[test]
fn test_two_contextual_layers_keep_separate_scopes() {
    let var_map = VarMap::new();
    let forward = ContextualEmbeddingLayer::new("elmo_forward", ContextualEmbeddingConfig::default());
    let backward =
        ContextualEmbeddingLayer::new("elmo_backward", ContextualEmbeddingConfig::default());

    forward.build(&LocalHub, &var_map).unwrap();
    backward.build(&LocalHub, &var_map).unwrap();

    let data = var_map.data().lock().unwrap();
    assert!(data.contains_key("elmo_forward_module/lstm/kernel"));
    assert!(data.contains_key("elmo_backward_module/lstm/kernel"));
    assert_eq!(data.len(), 2);
}
