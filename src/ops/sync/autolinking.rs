//! Invokes `link-harmony`, which registers native packages found in
//! `node_modules` with the native build.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::core::AbsolutePath;
use crate::ops::sync::react_native_cli;
use crate::ops::sync::subtask::Subtask;
use crate::util::CommandExecutor;

/// Arguments forwarded to the linker.
///
/// `harmony_project_path` is relative to the pivot; the `*_relative_to_harmony`
/// paths are relative to the harmony project. Package filters are
/// `;`-joined and wrapped in double quotes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutolinkingArgs {
    pub harmony_project_path: String,
    pub node_modules_path: String,
    pub cmake_autolink_path_relative_to_harmony: String,
    pub cpp_rnoh_packages_factory_path_relative_to_harmony: String,
    pub ets_rnoh_packages_factory_path_relative_to_harmony: String,
    pub oh_package_path_relative_to_harmony: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude_npm_packages: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_npm_packages: Option<String>,
}

/// The linker always resolves packages from the pivot's `node_modules`.
const NODE_MODULES_RELATIVE_TO_PIVOT: &str = "node_modules";

pub struct AutolinkingSubtask<'a> {
    executor: &'a dyn CommandExecutor,
    pivot: AbsolutePath,
    input: Option<AutolinkingArgs>,
}

impl<'a> AutolinkingSubtask<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        pivot: AbsolutePath,
        input: Option<AutolinkingArgs>,
    ) -> Self {
        AutolinkingSubtask {
            executor,
            pivot,
            input,
        }
    }
}

impl Subtask for AutolinkingSubtask<'_> {
    fn name(&self) -> &'static str {
        "autolink"
    }

    fn run(&self) -> Result<()> {
        let Some(ref input) = self.input else {
            tracing::warn!("[autolink] skipped");
            return Ok(());
        };

        let args = AutolinkingArgs {
            node_modules_path: NODE_MODULES_RELATIVE_TO_PIVOT.to_string(),
            ..input.clone()
        };
        let args = serde_json::to_value(&args).context("failed to serialize autolinking args")?;
        let output = self.executor.run(
            &react_native_cli("link-harmony"),
            &args,
            self.pivot.as_path(),
        )?;
        tracing::info!("[autolink]\n{}", output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockExecutor, MockProcessOutput};
    use tempfile::TempDir;

    fn args(pivot: &std::path::Path) -> AutolinkingArgs {
        AutolinkingArgs {
            harmony_project_path: "harmony".into(),
            node_modules_path: pivot.join("node_modules").display().to_string(),
            cmake_autolink_path_relative_to_harmony: "./entry/src/main/cpp/autolinking.cmake".into(),
            cpp_rnoh_packages_factory_path_relative_to_harmony:
                "./entry/src/main/cpp/RNOHPackagesFactory.h".into(),
            ets_rnoh_packages_factory_path_relative_to_harmony:
                "./entry/src/main/ets/RNOHPackagesFactory.ets".into(),
            oh_package_path_relative_to_harmony: "./oh-package.json5".into(),
            exclude_npm_packages: Some("\"a;b\"".into()),
            include_npm_packages: None,
        }
    }

    #[test]
    fn test_node_modules_is_relative_to_pivot() {
        let tmp = TempDir::new().unwrap();
        let exec = MockExecutor::new();
        exec.expect_contains("link-harmony", MockProcessOutput::success("linked"));

        let task = AutolinkingSubtask::new(
            &exec,
            AbsolutePath::new(tmp.path()).unwrap(),
            Some(args(tmp.path())),
        );
        task.run().unwrap();

        let calls = exec.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].cwd, tmp.path());
        assert_eq!(calls[0].args["nodeModulesPath"], "node_modules");
        assert_eq!(calls[0].args["harmonyProjectPath"], "harmony");
        assert!(calls[0].args.get("includeNpmPackages").is_none());
        assert!(calls[0].line.contains("--exclude-npm-packages \"a;b\""));
    }

    #[test]
    fn test_skip_runs_nothing() {
        let tmp = TempDir::new().unwrap();
        let exec = MockExecutor::new();
        let task = AutolinkingSubtask::new(&exec, AbsolutePath::new(tmp.path()).unwrap(), None);
        task.run().unwrap();
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_linker_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let exec = MockExecutor::new();
        exec.expect_contains("link-harmony", MockProcessOutput::failure(2, "no oh-package.json5"));

        let task = AutolinkingSubtask::new(
            &exec,
            AbsolutePath::new(tmp.path()).unwrap(),
            Some(args(tmp.path())),
        );
        assert!(task.run().is_err());
    }
}
