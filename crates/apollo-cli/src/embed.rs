//! `inspect` and `embed` command implementations.
//!
//! Both commands go through the library exactly as a model builder would:
//! the table comes from the process-wide cache, masks flow from the lookup
//! into the pooling layer.

use anyhow::{anyhow, Context, Result};
use apollo_layers::{
    global_table_cache, pad_indices, EmptySequencePolicy, Layer, MaskOutput, MaskedMeanPool,
    StaticEmbeddingConfig, StaticEmbeddingLookup,
};
use candle_core::Device;
use serde::Serialize;
use tracing::info;

/// Shape of a loaded static embedding table.
#[derive(Debug, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub dimension: usize,
    pub vocab_size: usize,
    pub path_template: String,
}

/// One pooled input sequence.
#[derive(Debug, Serialize)]
pub struct PooledSequence {
    pub tokens: Vec<u32>,
    /// Positions that contributed to the mean
    pub valid_positions: usize,
    pub vector: Vec<f32>,
}

/// Parses a comma-separated list of token indices such as `"4, 17,9"`.
pub fn parse_sequence(raw: &str) -> Result<Vec<u32>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .with_context(|| format!("Invalid token index '{}' in \"{}\"", s, raw))
        })
        .collect()
}

fn load_lookup(config: &StaticEmbeddingConfig) -> Result<StaticEmbeddingLookup> {
    info!(
        "Loading {}-d table from template {}",
        config.dimension, config.path_template
    );
    StaticEmbeddingLookup::new(config, global_table_cache())
        .with_context(|| format!("Failed to load {}-d embedding table", config.dimension))
}

/// Loads the table for `dimension` and reports its shape.
pub fn execute_inspect(dimension: usize, path_template: String) -> Result<TableSummary> {
    let config = StaticEmbeddingConfig::new(dimension, path_template);
    let lookup = load_lookup(&config)?;

    Ok(TableSummary {
        name: lookup.name().to_string(),
        dimension: lookup.embedding_dim(),
        vocab_size: lookup.vocab_size(),
        path_template: config.path_template,
    })
}

/// Embeds each sequence and mean-pools it into one vector.
pub fn execute_embed(
    config: &StaticEmbeddingConfig,
    policy: EmptySequencePolicy,
    sequences: &[String],
) -> Result<Vec<PooledSequence>> {
    if sequences.is_empty() {
        return Err(anyhow!("No sequences given. Pass one or more lists like 4,17,9"));
    }

    let rows = sequences
        .iter()
        .map(|s| parse_sequence(s))
        .collect::<Result<Vec<_>>>()?;

    let lookup = load_lookup(config)?;
    let pool = MaskedMeanPool::new("mean_pool").with_policy(policy);

    let indices = pad_indices(&rows, &Device::Cpu)?;
    let mask = lookup.compute_mask(&indices, &MaskOutput::NoMask)?;
    let embedded = lookup.forward(&indices, &MaskOutput::NoMask)?;
    let pooled = pool.forward(&embedded, &mask)?;

    let time = indices.dims()[1];
    let valid_counts = match mask.as_mask() {
        Some(mask) => mask.valid_counts()?,
        None => vec![time as u32; rows.len()],
    };

    let vectors = pooled.to_vec2::<f32>()?;
    info!("Pooled {} sequences over {} positions", rows.len(), time);

    Ok(rows
        .into_iter()
        .zip(valid_counts)
        .zip(vectors)
        .map(|((tokens, valid), vector)| PooledSequence {
            tokens,
            valid_positions: valid as usize,
            vector,
        })
        .collect())
}
