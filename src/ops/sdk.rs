//! DevEco SDK layout.
//!
//! ```text
//! <DEVECO_SDK_HOME>/            e.g. .../DevEco-Studio/sdk
//!   <version>/openharmony/toolchains/hdc
//! <DEVECO_SDK_HOME>/../tools/
//!   ohpm/bin/ohpm[.bat]
//!   node/bin/node | node/node
//!   hvigor/bin/hvigorw.js
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::core::AbsolutePath;
use crate::util::diagnostic::{suggestions, Diagnostic, DiagnosticError};
use crate::util::fs::subdirectory_names;
use crate::util::process::{find_executable, shell_quote};
use crate::util::Environment;

/// A located DevEco SDK.
#[derive(Debug, Clone)]
pub struct DevEcoSdk {
    home: AbsolutePath,
}

impl DevEcoSdk {
    pub fn new(home: AbsolutePath) -> Self {
        DevEcoSdk { home }
    }

    /// Locate the SDK from `DEVECO_SDK_HOME`.
    pub fn from_env(env: &Environment) -> Result<Self> {
        let home = env.sdk_home().ok_or_else(|| {
            let hint = if cfg!(target_os = "macos") {
                suggestions::SET_SDK_HOME_MACOS
            } else {
                suggestions::SET_SDK_HOME
            };
            DiagnosticError(
                Diagnostic::error("DEVECO_SDK_HOME environment variable is not set")
                    .with_suggestion(hint),
            )
        })?;
        Ok(DevEcoSdk::new(env.resolve(home)))
    }

    pub fn home(&self) -> &AbsolutePath {
        &self.home
    }

    /// `<home>/<first sdk dir>/openharmony/toolchains`.
    pub fn toolchains_dir(&self) -> Result<AbsolutePath> {
        let names = subdirectory_names(self.home.as_path())?;
        let first = names.first().ok_or_else(|| {
            DiagnosticError(Diagnostic::error(format!("{} has no directories", self.home)))
        })?;
        Ok(self.home.join([first.as_str(), "openharmony", "toolchains"]))
    }

    /// The device connector. Falls back to `hdc` on `PATH` when the SDK has
    /// no versioned toolchain directory.
    pub fn hdc(&self) -> Result<PathBuf> {
        match self.toolchains_dir() {
            Ok(dir) => Ok(dir.join(["hdc"]).into_path_buf()),
            Err(err) => find_executable("hdc")
                .with_context(|| format!("hdc not found in SDK or PATH: {:#}", err)),
        }
    }

    /// `<home>/../tools`, which must exist.
    pub fn tools_dir(&self) -> Result<AbsolutePath> {
        let tools = self.home.join(["..", "tools"]);
        if !tools.exists() {
            return Err(DiagnosticError(Diagnostic::error(format!("{} doesn't exist", tools))).into());
        }
        Ok(tools)
    }

    pub fn ohpm(&self) -> Result<PathBuf> {
        let bin = if cfg!(windows) { "ohpm.bat" } else { "ohpm" };
        Ok(self.tools_dir()?.join(["ohpm", "bin", bin]).into_path_buf())
    }

    pub fn node(&self) -> Result<PathBuf> {
        let tools = self.tools_dir()?;
        let node = tools.join(["node", "bin", "node"]);
        if node.exists() {
            Ok(node.into_path_buf())
        } else {
            Ok(tools.join(["node", "node"]).into_path_buf())
        }
    }

    pub fn hvigorw_js(&self) -> Result<PathBuf> {
        Ok(self.tools_dir()?.join(["hvigor", "bin", "hvigorw.js"]).into_path_buf())
    }
}

/// A path as one shell word.
pub fn shell_path(path: &std::path::Path) -> String {
    shell_quote(&path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::context::SDK_HOME_VAR;
    use std::fs;
    use tempfile::TempDir;

    fn sdk_in(tmp: &TempDir) -> DevEcoSdk {
        DevEcoSdk::new(AbsolutePath::new(tmp.path().join("sdk")).unwrap())
    }

    #[test]
    fn test_missing_sdk_home_is_diagnostic() {
        let tmp = TempDir::new().unwrap();
        let env = Environment::new(AbsolutePath::new(tmp.path()).unwrap());
        let err = DevEcoSdk::from_env(&env).unwrap_err();
        let diag = err.downcast_ref::<DiagnosticError>().unwrap();
        assert!(diag.0.message.contains("DEVECO_SDK_HOME"));
        assert_eq!(diag.0.suggestions.len(), 1);
    }

    #[test]
    fn test_hdc_under_first_sdk_directory() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sdk/default/openharmony/toolchains")).unwrap();
        fs::create_dir_all(tmp.path().join("sdk/zz-other")).unwrap();

        let env = Environment::new(AbsolutePath::new(tmp.path()).unwrap())
            .with_var(SDK_HOME_VAR, "sdk");
        let sdk = DevEcoSdk::from_env(&env).unwrap();

        assert_eq!(
            sdk.hdc().unwrap(),
            tmp.path().join("sdk/default/openharmony/toolchains/hdc")
        );
    }

    #[test]
    fn test_tools_dir_must_exist() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("sdk")).unwrap();
        let sdk = sdk_in(&tmp);
        assert!(sdk.tools_dir().is_err());

        fs::create_dir_all(tmp.path().join("tools/node/node")).unwrap();
        assert_eq!(sdk.node().unwrap(), tmp.path().join("tools/node/node"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_path_quotes_spaces() {
        assert_eq!(shell_path(std::path::Path::new("/a b/hdc")), "'/a b/hdc'");
        assert_eq!(shell_path(std::path::Path::new("/opt/hdc")), "/opt/hdc");
    }
}
