//! The `bundle-harmony` pipeline.
//!
//! Loads the bundler configuration, builds the JS bundle (and source map),
//! writes them out, then asks a short-lived asset server which assets the
//! bundle references and copies them into the native resource directory.
//!
//! The bundler itself is a seam: [`MetroBundler`] drives Metro through
//! `node`, tests use an in-process fake.

mod metro;

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::core::{AbsolutePath, AssetDescriptor};
use crate::ops::assets::copy_assets;
use crate::util::fs::write_string;
use crate::util::Environment;

pub use metro::MetroBundler;

pub const TARGET_PLATFORM: &str = "harmony";
pub const DEFAULT_ENTRY_FILE: &str = "index.js";
pub const DEFAULT_BUNDLE_OUTPUT: &str = "./harmony/entry/src/main/resources/rawfile/bundle.harmony.js";
pub const DEFAULT_ASSETS_DEST: &str = "./harmony/entry/src/main/resources/rawfile/assets";

/// Options shared by the build and the asset query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOptions {
    pub entry: String,
    pub platform: String,
    pub dev: bool,
    pub minify: bool,
    pub source_map: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_map_url: Option<String>,
}

/// Output of a bundler build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Bundle {
    pub code: String,
    #[serde(default)]
    pub map: String,
}

/// Resolved bundler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerConfig {
    pub project_root: AbsolutePath,
    /// Explicit config file; `None` lets the bundler search for one.
    pub config_path: Option<AbsolutePath>,
}

/// A JS bundler.
pub trait Bundler {
    fn load_config(&self, config_path: Option<&Path>) -> Result<BundlerConfig>;

    fn build(&self, config: &BundlerConfig, options: &BuildOptions) -> Result<Bundle>;

    fn open_asset_server(&self, config: &BundlerConfig) -> Result<Box<dyn AssetServer>>;
}

/// A running server that can report the assets a bundle references.
///
/// Must be released with [`AssetServer::end`]; [`AssetServerGuard`] does
/// that on every exit path.
pub trait AssetServer {
    fn assets(&mut self, options: &BuildOptions) -> Result<Vec<AssetDescriptor>>;

    fn end(&mut self);
}

/// Ends the wrapped server when dropped.
pub struct AssetServerGuard {
    server: Box<dyn AssetServer>,
}

impl AssetServerGuard {
    pub fn new(server: Box<dyn AssetServer>) -> Self {
        AssetServerGuard { server }
    }

    pub fn assets(&mut self, options: &BuildOptions) -> Result<Vec<AssetDescriptor>> {
        self.server.assets(options)
    }
}

impl Drop for AssetServerGuard {
    fn drop(&mut self) {
        self.server.end();
    }
}

/// `bundle-harmony` arguments, paths as the user gave them.
#[derive(Debug, Clone)]
pub struct BundleOptions {
    pub entry_file: String,
    pub dev: bool,
    /// Overrides the `!dev` default.
    pub minify: Option<bool>,
    pub config: Option<PathBuf>,
    pub bundle_output: PathBuf,
    pub assets_dest: Option<PathBuf>,
    pub sourcemap_output: Option<PathBuf>,
}

impl Default for BundleOptions {
    fn default() -> Self {
        BundleOptions {
            entry_file: DEFAULT_ENTRY_FILE.to_string(),
            dev: true,
            minify: None,
            config: None,
            bundle_output: PathBuf::from(DEFAULT_BUNDLE_OUTPUT),
            assets_dest: Some(PathBuf::from(DEFAULT_ASSETS_DEST)),
            sourcemap_output: None,
        }
    }
}

impl BundleOptions {
    pub fn build_options(&self) -> BuildOptions {
        let source_map_url = self
            .sourcemap_output
            .as_ref()
            .map(|p| p.display().to_string());
        BuildOptions {
            entry: self.entry_file.clone(),
            platform: TARGET_PLATFORM.to_string(),
            dev: self.dev,
            minify: self.minify.unwrap_or(!self.dev),
            source_map: source_map_url.is_some(),
            source_map_url,
        }
    }
}

/// What a bundle run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleReport {
    pub bundle_output: AbsolutePath,
    pub sourcemap_output: Option<AbsolutePath>,
    pub assets_copied: usize,
}

/// Timestamped progress lines, printed only when `RNOH_BUNDLE_DEBUG=true`.
struct DebugLog {
    enabled: bool,
}

impl DebugLog {
    fn log(&self, message: &str) {
        if self.enabled {
            let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            println!("[{}] {}", now, message);
        }
    }
}

/// Run the whole bundle pipeline.
pub fn bundle(env: &Environment, bundler: &dyn Bundler, options: &BundleOptions) -> Result<BundleReport> {
    let debug = DebugLog {
        enabled: env.bundle_debug(),
    };
    debug.log("Starting bundle-harmony process...");

    let build_options = options.build_options();
    let config_path = options.config.as_ref().map(|p| env.resolve(p));
    let config = bundler.load_config(config_path.as_ref().map(AbsolutePath::as_path))?;

    debug.log("Creating bundle...");
    let bundle = bundler.build(&config, &build_options)?;

    let bundle_output = env.resolve(&options.bundle_output);
    write_string(bundle_output.as_path(), &bundle.code)?;
    println!("[CREATED] {}", options.bundle_output.display());

    let sourcemap_output = match &options.sourcemap_output {
        Some(path) => {
            let resolved = env.resolve(path);
            write_string(resolved.as_path(), &bundle.map)?;
            println!("[CREATED] {}", path.display());
            Some(resolved)
        }
        None => None,
    };

    let assets = retrieve_assets(bundler, &config, &build_options)?;
    debug.log("Copying assets...");
    let assets_dest = options.assets_dest.as_ref().map(|p| env.resolve(p));
    let assets_copied = copy_assets(&assets, assets_dest.as_ref().map(AbsolutePath::as_path))?;
    debug.log("Assets copy completed, cleaning up...");
    debug.log("Bundle process finished, exiting");

    Ok(BundleReport {
        bundle_output,
        sourcemap_output,
        assets_copied,
    })
}

fn retrieve_assets(
    bundler: &dyn Bundler,
    config: &BundlerConfig,
    options: &BuildOptions,
) -> Result<Vec<AssetDescriptor>> {
    let mut server = AssetServerGuard::new(bundler.open_asset_server(config)?);
    server.assets(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBundler;
    use crate::util::context::BUNDLE_DEBUG_VAR;
    use std::fs;
    use tempfile::TempDir;

    fn env_in(tmp: &TempDir) -> Environment {
        Environment::new(AbsolutePath::new(tmp.path()).unwrap())
    }

    fn image(tmp: &TempDir) -> AssetDescriptor {
        let file = tmp.path().join("logo.png");
        fs::write(&file, "png").unwrap();
        AssetDescriptor {
            name: "logo".into(),
            kind: "png".into(),
            scales: vec![1.0],
            files: vec![file],
            http_server_location: "/assets/img".into(),
            width: Some(10.0),
            height: Some(10.0),
            hash: "abc".into(),
        }
    }

    #[test]
    fn test_minify_defaults_to_not_dev() {
        let mut options = BundleOptions::default();
        assert!(!options.build_options().minify);

        options.dev = false;
        assert!(options.build_options().minify);

        options.minify = Some(false);
        assert!(!options.build_options().minify);
    }

    #[test]
    fn test_build_options_carry_platform_and_source_map() {
        let options = BundleOptions {
            sourcemap_output: Some(PathBuf::from("out/bundle.map")),
            ..BundleOptions::default()
        };
        let build = options.build_options();
        assert_eq!(build.platform, "harmony");
        assert_eq!(build.entry, "index.js");
        assert!(build.source_map);
        assert_eq!(build.source_map_url.as_deref(), Some("out/bundle.map"));
    }

    #[test]
    fn test_writes_bundle_map_and_assets() {
        let tmp = TempDir::new().unwrap();
        let bundler = FakeBundler::new("var a = 1;", "{\"mappings\":\"\"}").with_assets(vec![image(&tmp)]);

        let options = BundleOptions {
            sourcemap_output: Some(PathBuf::from("out/bundle.map")),
            ..BundleOptions::default()
        };
        let report = bundle(&env_in(&tmp), &bundler, &options).unwrap();

        let bundle_path = tmp.path().join("harmony/entry/src/main/resources/rawfile/bundle.harmony.js");
        assert_eq!(report.bundle_output.as_path(), bundle_path);
        assert_eq!(fs::read_to_string(&bundle_path).unwrap(), "var a = 1;");
        assert_eq!(
            fs::read_to_string(tmp.path().join("out/bundle.map")).unwrap(),
            "{\"mappings\":\"\"}"
        );
        assert_eq!(report.assets_copied, 1);
        assert!(tmp
            .path()
            .join("harmony/entry/src/main/resources/rawfile/assets/img/logo.png")
            .exists());
        assert!(bundler.server_ended());
    }

    #[test]
    fn test_build_and_asset_query_share_options() {
        let tmp = TempDir::new().unwrap();
        let bundler = FakeBundler::new("", "");
        let options = BundleOptions {
            dev: false,
            entry_file: "src/main.js".into(),
            ..BundleOptions::default()
        };
        bundle(&env_in(&tmp), &bundler, &options).unwrap();

        let seen = bundler.seen_options();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], seen[1]);
        assert!(seen[0].minify);
        assert_eq!(seen[0].entry, "src/main.js");
    }

    #[test]
    fn test_asset_server_ended_when_query_fails() {
        let tmp = TempDir::new().unwrap();
        let bundler = FakeBundler::new("code", "").failing_assets("resolver exploded");

        let err = bundle(&env_in(&tmp), &bundler, &BundleOptions::default()).unwrap_err();
        assert!(err.to_string().contains("resolver exploded"));
        assert!(bundler.server_ended());
    }

    #[test]
    fn test_failed_build_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let bundler = FakeBundler::new("code", "").failing_build("syntax error");

        assert!(bundle(&env_in(&tmp), &bundler, &BundleOptions::default()).is_err());
        assert!(!tmp.path().join("harmony").exists());
        assert!(!bundler.server_ended());
    }

    #[test]
    fn test_missing_assets_dest_skips_copy() {
        let tmp = TempDir::new().unwrap();
        let bundler = FakeBundler::new("code", "").with_assets(vec![image(&tmp)]);
        let options = BundleOptions {
            assets_dest: None,
            ..BundleOptions::default()
        };

        let env = env_in(&tmp).with_var(BUNDLE_DEBUG_VAR, "true");
        let report = bundle(&env, &bundler, &options).unwrap();
        assert_eq!(report.assets_copied, 0);
        assert!(report.sourcemap_output.is_none());
    }
}
