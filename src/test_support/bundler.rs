//! In-process bundler double.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};

use crate::core::{AbsolutePath, AssetDescriptor};
use crate::ops::bundle::{AssetServer, BuildOptions, Bundle, Bundler, BundlerConfig};

/// Returns canned output and records what it was asked for.
#[derive(Debug, Default)]
pub struct FakeBundler {
    bundle: Bundle,
    assets: Vec<AssetDescriptor>,
    build_error: Option<String>,
    assets_error: Option<String>,
    seen: Arc<Mutex<Vec<BuildOptions>>>,
    ended: Arc<AtomicBool>,
}

impl FakeBundler {
    pub fn new(code: &str, map: &str) -> Self {
        FakeBundler {
            bundle: Bundle {
                code: code.to_string(),
                map: map.to_string(),
            },
            ..FakeBundler::default()
        }
    }

    pub fn with_assets(mut self, assets: Vec<AssetDescriptor>) -> Self {
        self.assets = assets;
        self
    }

    pub fn failing_build(mut self, message: &str) -> Self {
        self.build_error = Some(message.to_string());
        self
    }

    pub fn failing_assets(mut self, message: &str) -> Self {
        self.assets_error = Some(message.to_string());
        self
    }

    /// Options passed to `build` and then to the asset server, in order.
    pub fn seen_options(&self) -> Vec<BuildOptions> {
        self.seen.lock().unwrap().clone()
    }

    pub fn server_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

impl Bundler for FakeBundler {
    fn load_config(&self, config_path: Option<&Path>) -> Result<BundlerConfig> {
        Ok(BundlerConfig {
            project_root: AbsolutePath::resolve(Path::new("/"), "app"),
            config_path: config_path.and_then(AbsolutePath::new),
        })
    }

    fn build(&self, _config: &BundlerConfig, options: &BuildOptions) -> Result<Bundle> {
        self.seen.lock().unwrap().push(options.clone());
        if let Some(message) = &self.build_error {
            bail!("{}", message);
        }
        Ok(self.bundle.clone())
    }

    fn open_asset_server(&self, _config: &BundlerConfig) -> Result<Box<dyn AssetServer>> {
        Ok(Box::new(FakeAssetServer {
            assets: self.assets.clone(),
            error: self.assets_error.clone(),
            seen: Arc::clone(&self.seen),
            ended: Arc::clone(&self.ended),
        }))
    }
}

struct FakeAssetServer {
    assets: Vec<AssetDescriptor>,
    error: Option<String>,
    seen: Arc<Mutex<Vec<BuildOptions>>>,
    ended: Arc<AtomicBool>,
}

impl AssetServer for FakeAssetServer {
    fn assets(&mut self, options: &BuildOptions) -> Result<Vec<AssetDescriptor>> {
        self.seen.lock().unwrap().push(options.clone());
        if let Some(message) = &self.error {
            bail!("{}", message);
        }
        Ok(self.assets.clone())
    }

    fn end(&mut self) {
        self.ended.store(true, Ordering::SeqCst);
    }
}
