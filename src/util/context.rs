//! Process environment captured once at startup.
//!
//! Operations never call `std::env` directly; they receive an
//! [`Environment`] so tests can supply their own working directory and
//! variables.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::AbsolutePath;

/// DevEco SDK location.
pub const SDK_HOME_VAR: &str = "DEVECO_SDK_HOME";

/// Default dev-server port override.
pub const METRO_PORT_VAR: &str = "RCT_METRO_PORT";

/// Enables timestamped debug lines during bundling when set to `true`.
pub const BUNDLE_DEBUG_VAR: &str = "RNOH_BUNDLE_DEBUG";

const CAPTURED_VARS: &[&str] = &[SDK_HOME_VAR, METRO_PORT_VAR, BUNDLE_DEBUG_VAR];

/// Immutable snapshot of the working directory and relevant variables.
#[derive(Debug, Clone)]
pub struct Environment {
    cwd: AbsolutePath,
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process's working directory and variables.
    pub fn from_process() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to determine current directory")?;
        let cwd = AbsolutePath::new(&cwd)
            .with_context(|| format!("current directory is not absolute: {}", cwd.display()))?;

        let vars = CAPTURED_VARS
            .iter()
            .filter_map(|name| std::env::var(name).ok().map(|v| (name.to_string(), v)))
            .collect();

        Ok(Environment { cwd, vars })
    }

    /// An environment rooted at `cwd` with no variables set.
    pub fn new(cwd: AbsolutePath) -> Self {
        Environment {
            cwd,
            vars: HashMap::new(),
        }
    }

    /// Set a variable.
    pub fn with_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into(), value.into());
        self
    }

    pub fn cwd(&self) -> &AbsolutePath {
        &self.cwd
    }

    /// Look up a variable; empty values count as unset.
    pub fn var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn sdk_home(&self) -> Option<PathBuf> {
        self.var(SDK_HOME_VAR).map(PathBuf::from)
    }

    /// Port from `RCT_METRO_PORT`, if it parses.
    pub fn metro_port(&self) -> Option<u16> {
        self.var(METRO_PORT_VAR).and_then(|p| p.parse().ok())
    }

    pub fn bundle_debug(&self) -> bool {
        self.var(BUNDLE_DEBUG_VAR) == Some("true")
    }

    /// Resolve a user-supplied path against the working directory.
    pub fn resolve(&self, path: impl AsRef<std::path::Path>) -> AbsolutePath {
        AbsolutePath::resolve(self.cwd.as_path(), path)
    }
}
