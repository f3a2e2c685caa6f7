//! Metro, driven through `node`.
//!
//! Both scripts are evaluated with `node -e` from the project root so
//! `require('metro')` resolves against the app's own `node_modules`.
//! Replies are written on stdout as single lines prefixed with
//! [`REPLY_PREFIX`]; anything else Metro prints is ignored.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Stdio};

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;

use super::{AssetServer, BuildOptions, Bundle, Bundler, BundlerConfig};
use crate::core::{AbsolutePath, AssetDescriptor};
use crate::util::process::{find_node, ProcessBuilder};

const REPLY_PREFIX: &str = "@@rnoh ";
const CONFIG_VAR: &str = "RNOH_METRO_CONFIG";

const BUILD_SCRIPT: &str = r#"
const Metro = require('metro');
let input = '';
process.stdin.on('data', (chunk) => (input += chunk));
process.stdin.on('end', async () => {
  try {
    const options = JSON.parse(input);
    const configPath = process.env.RNOH_METRO_CONFIG;
    const config = configPath
      ? await Metro.loadConfig({ config: configPath })
      : await Metro.loadConfig();
    const result = await Metro.runBuild(config, options);
    process.stdout.write('\n@@rnoh ' + JSON.stringify({ code: result.code, map: result.map }) + '\n');
  } catch (e) {
    console.error((e && e.stack) || String(e));
    process.exit(1);
  }
});
"#;

const ASSET_SERVER_SCRIPT: &str = r#"
const Metro = require('metro');
const MetroServer = require('metro/src/Server');
const readline = require('readline');
(async () => {
  const configPath = process.env.RNOH_METRO_CONFIG;
  const config = configPath
    ? await Metro.loadConfig({ config: configPath })
    : await Metro.loadConfig();
  const server = new MetroServer(config);
  const reply = (value) => process.stdout.write('\n@@rnoh ' + JSON.stringify(value) + '\n');
  try {
    for await (const line of readline.createInterface({ input: process.stdin })) {
      if (!line.trim()) continue;
      try {
        const options = JSON.parse(line);
        const assets = await server.getAssets({
          ...MetroServer.DEFAULT_BUNDLE_OPTIONS,
          ...options,
          entryFile: options.entry,
        });
        reply({ assets });
      } catch (e) {
        reply({ error: (e && e.stack) || String(e) });
      }
    }
  } finally {
    server.end();
  }
})().catch((e) => {
  console.error((e && e.stack) || String(e));
  process.exit(1);
});
"#;

/// Metro bundler for the project rooted at `project_root`.
#[derive(Debug, Clone)]
pub struct MetroBundler {
    node: PathBuf,
    project_root: AbsolutePath,
}

impl MetroBundler {
    pub fn new(node: impl Into<PathBuf>, project_root: AbsolutePath) -> Self {
        MetroBundler {
            node: node.into(),
            project_root,
        }
    }

    /// Use the `node` found on `PATH`.
    pub fn locate(project_root: AbsolutePath) -> Result<Self> {
        let node = find_node().context("`node` was not found on PATH; it is required to run Metro")?;
        Ok(MetroBundler::new(node, project_root))
    }

    fn script(&self, config: &BundlerConfig, script: &str) -> ProcessBuilder {
        let mut pb = ProcessBuilder::new(&self.node)
            .arg("-e")
            .arg(script)
            .cwd(config.project_root.as_path());
        if let Some(path) = &config.config_path {
            pb = pb.env(CONFIG_VAR, path.to_string());
        }
        pb
    }
}

impl Bundler for MetroBundler {
    fn load_config(&self, config_path: Option<&Path>) -> Result<BundlerConfig> {
        let config_path = match config_path {
            Some(path) => {
                let path = AbsolutePath::resolve(self.project_root.as_path(), path);
                if !path.exists() {
                    bail!("Metro config file not found: {}", path);
                }
                Some(path)
            }
            None => None,
        };
        Ok(BundlerConfig {
            project_root: self.project_root.clone(),
            config_path,
        })
    }

    fn build(&self, config: &BundlerConfig, options: &BuildOptions) -> Result<Bundle> {
        let input = serde_json::to_vec(options)?;
        let output = self
            .script(config, BUILD_SCRIPT)
            .stdin(input)
            .exec_and_check()
            .context("Metro build failed")?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let reply = stdout
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(REPLY_PREFIX))
            .ok_or_else(|| anyhow!("Metro build produced no bundle"))?;
        serde_json::from_str(reply).context("failed to parse Metro build output")
    }

    fn open_asset_server(&self, config: &BundlerConfig) -> Result<Box<dyn AssetServer>> {
        let mut cmd = self.script(config, ASSET_SERVER_SCRIPT).build_command();
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::inherit());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.node.display()))?;
        let stdin = child.stdin.take().context("asset server stdin was not captured")?;
        let stdout = child.stdout.take().context("asset server stdout was not captured")?;

        Ok(Box::new(MetroAssetServer {
            child,
            stdin: Some(stdin),
            stdout: BufReader::new(stdout),
        }))
    }
}

#[derive(Debug, Deserialize)]
struct AssetReply {
    #[serde(default)]
    assets: Vec<AssetDescriptor>,
    error: Option<String>,
}

struct MetroAssetServer {
    child: Child,
    stdin: Option<ChildStdin>,
    stdout: BufReader<ChildStdout>,
}

impl MetroAssetServer {
    fn read_reply(&mut self) -> Result<AssetReply> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.stdout.read_line(&mut line)? == 0 {
                bail!("Metro asset server exited before replying");
            }
            if let Some(reply) = line.trim_end().strip_prefix(REPLY_PREFIX) {
                return serde_json::from_str(reply).context("failed to parse Metro asset list");
            }
        }
    }
}

impl AssetServer for MetroAssetServer {
    fn assets(&mut self, options: &BuildOptions) -> Result<Vec<AssetDescriptor>> {
        let stdin = self
            .stdin
            .as_mut()
            .context("Metro asset server has already ended")?;
        let mut request = serde_json::to_string(options)?;
        request.push('\n');
        stdin.write_all(request.as_bytes())?;
        stdin.flush()?;

        let reply = self.read_reply()?;
        match reply.error {
            Some(error) => Err(anyhow!("Metro failed to collect assets:\n{}", error)),
            None => Ok(reply.assets),
        }
    }

    /// Closing stdin lets the script end the server and exit.
    fn end(&mut self) {
        drop(self.stdin.take());
        if let Err(err) = self.child.wait() {
            tracing::warn!("failed to wait for the Metro asset server: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_config_resolves_against_project_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("metro.config.js"), "module.exports = {};").unwrap();
        let bundler = MetroBundler::new("node", AbsolutePath::new(tmp.path()).unwrap());

        let config = bundler.load_config(Some(Path::new("metro.config.js"))).unwrap();
        assert_eq!(
            config.config_path.unwrap().as_path(),
            tmp.path().join("metro.config.js")
        );

        assert!(bundler.load_config(Some(Path::new("missing.js"))).is_err());
        assert!(bundler.load_config(None).unwrap().config_path.is_none());
    }

    #[test]
    fn test_asset_reply_accepts_metro_fields() {
        let reply: AssetReply = serde_json::from_str(
            r#"{"assets":[{"__packager_asset":true,"fileSystemLocation":"/app/img",
                "httpServerLocation":"/assets/img","name":"logo","type":"png",
                "scales":[1,2],"files":["/app/img/logo.png","/app/img/logo@2x.png"],
                "hash":"f00","width":24,"height":24}]}"#,
        )
        .unwrap();
        assert!(reply.error.is_none());
        assert_eq!(reply.assets[0].scales, vec![1.0, 2.0]);
        assert_eq!(reply.assets[0].kind, "png");
    }
}
