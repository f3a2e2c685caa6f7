//! Loading module-plugin options from disk.
//!
//! The plugin host normally hands options over in memory. The `sync`
//! command reads the same structure from a file instead:
//! - `*.json` / `*.json5`: parsed with JSON5 (a JSON superset)
//! - `*.toml`: same camelCase keys; `false` stands in for `null`

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::core::ModuleOptions;
use crate::util::fs::read_to_string;

/// Load options from `path`, picking the format from its extension.
pub fn load_options(path: &Path) -> Result<ModuleOptions> {
    let contents = read_to_string(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    match ext.as_str() {
        "json" | "json5" => parse_json5_options(&contents)
            .with_context(|| format!("failed to parse options: {}", path.display())),
        "toml" => toml::from_str(&contents)
            .with_context(|| format!("failed to parse options: {}", path.display())),
        other => bail!(
            "unsupported options file extension `{}` (expected .json, .json5 or .toml): {}",
            other,
            path.display()
        ),
    }
}

/// Parse options from JSON5 text.
pub fn parse_json5_options(contents: &str) -> Result<ModuleOptions> {
    Ok(json5::from_str(contents)?)
}
