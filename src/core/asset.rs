//! Asset descriptors reported by the JS bundler.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Resolution scales the native resource directory understands.
pub const ALLOWED_SCALES: [f64; 4] = [1.0, 2.0, 3.0, 4.0];

/// One logical asset and its resolution variants.
///
/// `scales` and `files` are parallel arrays; the bundler emits `scales`
/// sorted ascending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub scales: Vec<f64>,
    pub files: Vec<PathBuf>,
    pub http_server_location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default)]
    pub hash: String,
}

impl AssetDescriptor {
    /// Indices into `scales`/`files` of the variants that get copied.
    ///
    /// Keeps every scale in [`ALLOWED_SCALES`]. When none qualifies, falls
    /// back to the smallest scale above the allowed range, and failing that
    /// to the largest scale present, so a non-empty asset always yields one
    /// variant.
    pub fn selected_variants(&self) -> Vec<usize> {
        let allowed: Vec<usize> = self
            .scales
            .iter()
            .enumerate()
            .filter(|(_, s)| ALLOWED_SCALES.contains(s))
            .map(|(i, _)| i)
            .collect();

        if !allowed.is_empty() || self.scales.is_empty() {
            return allowed;
        }

        let max_allowed = ALLOWED_SCALES[ALLOWED_SCALES.len() - 1];
        let above = self
            .scales
            .iter()
            .enumerate()
            .filter(|(_, s)| **s > max_allowed)
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        let fallback = above.or_else(|| {
            self.scales
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.total_cmp(b))
        });

        fallback.map(|(i, _)| i).into_iter().collect()
    }

    /// Scales of the variants that get copied.
    pub fn selected_scales(&self) -> Vec<f64> {
        self.selected_variants()
            .into_iter()
            .map(|i| self.scales[i])
            .collect()
    }

    /// Destination path of the variant at `scale`, relative to the assets
    /// output directory.
    ///
    /// `/assets/img` + `icon` + `png` at scale 2 gives `img/icon@2x.png`.
    /// Every `../` becomes `_` so the result stays inside the output root.
    pub fn dest_relative_path(&self, scale: f64) -> String {
        let base = self
            .http_server_location
            .strip_prefix('/')
            .unwrap_or(&self.http_server_location);
        let identifier = format!("{}/{}", base, self.name);
        let identifier = identifier
            .strip_prefix("assets/")
            .unwrap_or(&identifier);

        let suffix = if scale == 1.0 {
            String::new()
        } else {
            format!("@{}x", format_scale(scale))
        };

        format!("{}{}.{}", identifier, suffix, self.kind).replace("../", "_")
    }
}

/// Render a scale the way the bundler does: `2`, `1.5`, `0.5`.
fn format_scale(scale: f64) -> String {
    if scale.fract() == 0.0 {
        format!("{}", scale as i64)
    } else {
        format!("{}", scale)
    }
}
