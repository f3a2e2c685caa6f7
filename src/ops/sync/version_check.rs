//! Keeps the build-plugin tarball reference in `hvigor/hvigor-config.json5`
//! pointing at the newest tarball shipped next to it.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use semver::Version;

use crate::core::AbsolutePath;
use crate::ops::sync::subtask::Subtask;
use crate::util::fs::{file_names, read_to_string, write_string};

const PLUGIN_DEPENDENCY: &str = "@rnoh/hvigor-plugin";

static TARBALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rnoh-hvigor-plugin-(\d+\.\d+\.\d+)\.tgz").expect("valid tarball pattern")
});

/// What a version check concluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionCheckOutcome {
    /// No config, no plugin dependency, or nothing to compare against.
    Skipped,
    UpToDate,
    /// The config now references `file_name`.
    Updated { from: Version, to: Version, file_name: String },
}

pub struct CheckPluginVersionSubtask {
    harmony_project_path: AbsolutePath,
}

impl CheckPluginVersionSubtask {
    pub fn new(harmony_project_path: AbsolutePath) -> Self {
        CheckPluginVersionSubtask {
            harmony_project_path,
        }
    }

    pub fn check(&self) -> Result<VersionCheckOutcome> {
        let hvigor_dir = self.harmony_project_path.join(["hvigor"]);
        let config_path = hvigor_dir.join(["hvigor-config.json5"]);
        if !config_path.exists() {
            return Ok(VersionCheckOutcome::Skipped);
        }

        let content = read_to_string(config_path.as_path())?;
        let config: serde_json::Value = json5::from_str(&content)
            .with_context(|| format!("failed to parse {}", config_path))?;

        let Some(reference) = config
            .get("dependencies")
            .and_then(|deps| deps.get(PLUGIN_DEPENDENCY))
            .and_then(|v| v.as_str())
        else {
            return Ok(VersionCheckOutcome::Skipped);
        };
        let reference = reference.strip_prefix("file:").unwrap_or(reference);

        let Some(current) = tarball_version(reference) else {
            tracing::info!("[{}] skip", PLUGIN_DEPENDENCY);
            return Ok(VersionCheckOutcome::Skipped);
        };

        let tarball_dir = hvigor_dir.join([reference, ".."]);
        let Some((found, file_name)) = file_names(tarball_dir.as_path())?
            .into_iter()
            .filter_map(|name| tarball_version(&name).map(|version| (version, name)))
            .max_by(|a, b| a.0.cmp(&b.0))
        else {
            tracing::info!("[{}] skip", PLUGIN_DEPENDENCY);
            return Ok(VersionCheckOutcome::Skipped);
        };

        if found <= current {
            return Ok(VersionCheckOutcome::UpToDate);
        }

        let updated = TARBALL.replace_all(&content, file_name.as_str());
        write_string(config_path.as_path(), &updated)?;
        tracing::info!(
            "[{}]\n- new version ({}) has been detected. You need to sync again to install the latest version.\n",
            PLUGIN_DEPENDENCY,
            found
        );

        Ok(VersionCheckOutcome::Updated {
            from: current,
            to: found,
            file_name,
        })
    }
}

fn tarball_version(s: &str) -> Option<Version> {
    TARBALL
        .captures(s)
        .and_then(|c| Version::parse(&c[1]).ok())
}

impl Subtask for CheckPluginVersionSubtask {
    fn name(&self) -> &'static str {
        "version-check"
    }

    fn run(&self) -> Result<()> {
        self.check().map(|_| ())
    }
}
