//! Copies bundler-reported assets into the native resource directory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::core::AssetDescriptor;
use crate::util::fs::copy_file;

/// Source file -> destination file.
///
/// Keyed by source, so the same source listed twice collapses into one copy
/// (the later destination wins). Iterates in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CopyPlan {
    entries: BTreeMap<PathBuf, PathBuf>,
}

impl CopyPlan {
    /// Plan the copies for `assets` into `dest_root`.
    pub fn build(assets: &[AssetDescriptor], dest_root: &Path) -> Self {
        let mut entries = BTreeMap::new();
        for asset in assets {
            for index in asset.selected_variants() {
                let Some(source) = asset.files.get(index) else {
                    tracing::warn!(
                        "asset `{}` lists scale {} without a file",
                        asset.name,
                        asset.scales[index]
                    );
                    continue;
                };
                let dest = dest_root.join(asset.dest_relative_path(asset.scales[index]));
                entries.insert(source.clone(), dest);
            }
        }
        CopyPlan { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.entries
            .iter()
            .map(|(src, dst)| (src.as_path(), dst.as_path()))
    }

    /// Copy every entry, one at a time. The first failure aborts the rest.
    pub fn execute(&self) -> Result<usize> {
        for (src, dst) in self.iter() {
            tracing::debug!("copying {} -> {}", src.display(), dst.display());
            copy_file(src, dst)?;
        }
        Ok(self.len())
    }
}

/// Copy `assets` into `dest_dir`. Returns the number of files copied.
///
/// Without a destination nothing is copied; that is a warning, not an error.
pub fn copy_assets(assets: &[AssetDescriptor], dest_dir: Option<&Path>) -> Result<usize> {
    let Some(dest_dir) = dest_dir else {
        tracing::warn!("Assets destination folder is not set, skipping...");
        return Ok(0);
    };
    if assets.is_empty() {
        return Ok(0);
    }

    let copied = CopyPlan::build(assets, dest_dir).execute()?;
    tracing::info!("Copied {} asset files into {}", copied, dest_dir.display());
    Ok(copied)
}
