//! Apollo CLI - inspect static embedding tables and pool token batches.
//!
//! # Usage
//!
//! ```bash
//! # Show vocabulary size and dimension of the 100-d table
//! apollo inspect --dimension 100
//!
//! # Mean-pool two index sequences, treating 0 as padding
//! apollo embed --dimension 50 --mask-zero 4,17,9 12,3
//! apollo embed --dimension 50 --path-template data/glove.6B.%dd.npy 4,17 --json
//! ```

mod config;
mod embed;
mod output;

use anyhow::Result;
use apollo_layers::{EmptySequencePolicy, StaticEmbeddingConfig};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Apollo embedding layer tools.
#[derive(Parser)]
#[command(name = "apollo", version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a static embedding table and print its shape
    Inspect {
        /// Embedding dimension (50, 100, 200 or 300)
        #[arg(short, long)]
        dimension: usize,

        /// Table path with a %d placeholder for the dimension
        #[arg(long)]
        path_template: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Look up index sequences and mean-pool each into one vector
    Embed {
        /// Embedding dimension (50, 100, 200 or 300)
        #[arg(short, long)]
        dimension: usize,

        /// Table path with a %d placeholder for the dimension
        #[arg(long)]
        path_template: Option<String>,

        /// Treat index 0 as padding
        #[arg(long)]
        mask_zero: bool,

        /// Result for sequences with no valid positions: zero, nan or error
        #[arg(long, default_value_t = EmptySequencePolicy::Zero)]
        empty_policy: EmptySequencePolicy,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Comma-separated token indices, one argument per sequence
        #[arg(required = true)]
        sequences: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Command::Inspect {
            dimension,
            path_template,
            json,
        } => {
            let template = config::resolve_path_template(path_template.as_deref())?;
            let summary = embed::execute_inspect(dimension, template)?;

            let output = if json {
                output::format_inspect_json(&summary)
            } else {
                output::format_inspect_human(&summary)
            };
            println!("{}", output);
        }
        Command::Embed {
            dimension,
            path_template,
            mask_zero,
            empty_policy,
            json,
            sequences,
        } => {
            let template = config::resolve_path_template(path_template.as_deref())?;
            let layer_config =
                StaticEmbeddingConfig::new(dimension, template).with_mask_zero(mask_zero);
            let results = embed::execute_embed(&layer_config, empty_policy, &sequences)?;

            let output = if json {
                output::format_embed_json(dimension, mask_zero, &results)
            } else {
                output::format_embed_human(&results)
            };
            println!("{}", output);
        }
    }

    Ok(())
}
