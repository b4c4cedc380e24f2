//! Path resolution for static embedding tables.
//!
//! The table path template is taken from, in order:
//! - the `--path-template` flag
//! - the `$APOLLO_GLOVE_TEMPLATE` environment variable
//! - `<data dir>/glove/glove.%d.npy` under the platform data directory

use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use std::path::PathBuf;

/// Environment variable for a custom table path template
const TEMPLATE_ENV: &str = "APOLLO_GLOVE_TEMPLATE";

/// File name pattern inside the data directory
const TABLE_FILENAME: &str = "glove.%d.npy";

/// Returns the platform data directory.
///
/// - macOS: `~/Library/Application Support/com.gengoai.Apollo/`
/// - Linux: `~/.local/share/apollo/`
/// - Windows: `%APPDATA%\gengoai\Apollo\data\`
pub fn get_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("com", "gengoai", "Apollo")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| anyhow!("Could not determine data directory"))
}

/// Picks the path template for static embedding tables.
pub fn resolve_path_template(explicit: Option<&str>) -> Result<String> {
    if let Some(template) = explicit {
        return Ok(template.to_string());
    }

    if let Ok(template) = std::env::var(TEMPLATE_ENV) {
        if !template.is_empty() {
            return Ok(template);
        }
    }

    let path = get_data_dir()?.join("glove").join(TABLE_FILENAME);
    Ok(path.to_string_lossy().into_owned())
}
