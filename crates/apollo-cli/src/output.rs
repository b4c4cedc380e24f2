//! Output formatting for command results.
//!
//! Supports both human-readable terminal output and JSON for scripting.

use crate::embed::{PooledSequence, TableSummary};
use serde::Serialize;

/// Number of leading vector components shown in human output
const PREVIEW_COMPONENTS: usize = 6;

/// JSON output structure for the embed command
#[derive(Serialize)]
pub struct JsonEmbedOutput<'a> {
    pub dimension: usize,
    pub mask_zero: bool,
    pub results: &'a [PooledSequence],
}

/// Formats a table summary as JSON.
pub fn format_inspect_json(summary: &TableSummary) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| "{}".to_string())
}

/// Formats a table summary for the terminal.
pub fn format_inspect_human(summary: &TableSummary) -> String {
    format!(
        "{}\n   Vocabulary: {} words\n   Dimension:  {}\n   Template:   {}",
        summary.name, summary.vocab_size, summary.dimension, summary.path_template
    )
}

/// Formats pooled vectors as JSON.
pub fn format_embed_json(dimension: usize, mask_zero: bool, results: &[PooledSequence]) -> String {
    let output = JsonEmbedOutput {
        dimension,
        mask_zero,
        results,
    };
    serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
}

/// Formats pooled vectors for the terminal, previewing the first components.
pub fn format_embed_human(results: &[PooledSequence]) -> String {
    let mut output = String::new();

    for (i, result) in results.iter().enumerate() {
        let tokens: Vec<String> = result.tokens.iter().map(|t| t.to_string()).collect();
        output.push_str(&format!(
            "{}. [{}] ({} valid position{})\n",
            i + 1,
            tokens.join(", "),
            result.valid_positions,
            if result.valid_positions == 1 { "" } else { "s" }
        ));

        let preview: Vec<String> = result
            .vector
            .iter()
            .take(PREVIEW_COMPONENTS)
            .map(|v| format!("{:.4}", v))
            .collect();
        let ellipsis = if result.vector.len() > PREVIEW_COMPONENTS {
            ", ..."
        } else {
            ""
        };
        output.push_str(&format!("   [{}{}]\n", preview.join(", "), ellipsis));
    }

    output.trim_end().to_string()
}
