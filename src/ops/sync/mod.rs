//! The sync pipeline run by the build-system plugin before each build.
//!
//! Validates the module options, derives every tool path relative to the
//! pivot directory (the parent of `node_modules`, where the linker and the
//! generator must be started), then runs, in order:
//!
//! 1. plugin version check
//! 2. dev-server port forward
//! 3. codegen
//! 4. autolinking
//!
//! The first failing subtask stops the pipeline.

pub mod autolinking;
pub mod codegen;
pub mod errors;
pub mod metro_port_forward;
pub mod subtask;
pub mod version_check;

use std::path::MAIN_SEPARATOR;

pub use autolinking::{AutolinkingArgs, AutolinkingSubtask};
pub use codegen::CodegenSubtask;
pub use errors::{SyncError, ValidationError};
pub use metro_port_forward::{MetroPortForwardInput, MetroPortForwardSubtask, DEFAULT_METRO_PORT};
pub use subtask::Subtask;
pub use version_check::{CheckPluginVersionSubtask, VersionCheckOutcome};

use crate::core::{AbsolutePath, CodegenConfig, ModuleOptions, OptionName, Subsystem};
use crate::ops::sdk::DevEcoSdk;
use crate::util::{CommandExecutor, Environment};

const DEFAULT_PROJECT_ROOT_PATH: &str = "../";
const DEFAULT_CPP_OUTPUT_PATH: &str = "./entry/src/main/cpp/generated";
const DEFAULT_ETS_OUTPUT_PATH: &str = "./";
const DEFAULT_CMAKE_AUTOLINK_PATH: &str = "./entry/src/main/cpp/autolinking.cmake";
const DEFAULT_CPP_PACKAGES_FACTORY_PATH: &str = "./entry/src/main/cpp/RNOHPackagesFactory.h";
const DEFAULT_ETS_PACKAGES_FACTORY_PATH: &str = "./entry/src/main/ets/RNOHPackagesFactory.ets";
const DEFAULT_OH_PACKAGE_PATH: &str = "./oh-package.json5";

/// `node_modules/.bin/react-native <subcommand>`, relative to the pivot.
pub(crate) fn react_native_cli(subcommand: &str) -> String {
    format!(
        "node_modules{sep}.bin{sep}react-native {}",
        subcommand,
        sep = MAIN_SEPARATOR
    )
}

/// Everything the subtasks need, computed once per run.
#[derive(Debug, Clone)]
pub struct SyncInput {
    /// The harmony project directory (the environment's cwd).
    pub harmony_project_path: AbsolutePath,
    pub node_modules_path: AbsolutePath,
    /// Working directory for the linker and the generator.
    pub pivot: AbsolutePath,
    pub sdk: DevEcoSdk,
    pub metro: Option<MetroPortForwardInput>,
    pub codegen_args: Option<CodegenConfig>,
    pub autolinking_args: Option<AutolinkingArgs>,
}

/// Coordinates one sync run.
pub struct SyncTask<'a> {
    executor: &'a dyn CommandExecutor,
    env: &'a Environment,
}

impl<'a> SyncTask<'a> {
    pub fn new(executor: &'a dyn CommandExecutor, env: &'a Environment) -> Self {
        SyncTask { executor, env }
    }

    pub fn run(&self, options: &ModuleOptions) -> Result<(), SyncError> {
        let input = self.prepare_input(options).inspect_err(|err| {
            tracing::error!("{}", err);
        })?;
        self.run_subtasks(&input)
    }

    /// Validate `options` and derive the subtask inputs.
    pub fn prepare_input(&self, options: &ModuleOptions) -> Result<SyncInput, ValidationError> {
        let cwd = self.env.cwd();

        let node_modules_path = match options.node_modules_path {
            Some(ref path) => self.env.resolve(path),
            None => cwd.join(["..", "node_modules"]),
        };
        if !node_modules_path.exists() {
            return Err(ValidationError::new(
                OptionName::NodeModulesPath,
                "path doesn't exist",
            ));
        }

        // Defaulted codegen has no output path either, so it fails too.
        if !options.codegen.is_disabled() {
            let has_output = options
                .codegen
                .explicit()
                .is_some_and(|c| {
                    non_empty(&c.ets_output_path).is_some()
                        || non_empty(&c.rnoh_module_path).is_some()
                });
            if !has_output {
                return Err(ValidationError::new(
                    OptionName::Codegen,
                    "etsOutputPath must be specified if codegen is not null",
                ));
            }
        }

        // Gates the whole pipeline; the option name is historical.
        let Some(sdk_home) = self.env.sdk_home() else {
            return Err(ValidationError::new(
                OptionName::Metro,
                "DEVECO_SDK_HOME must be specified if metro configuration is not null.",
            ));
        };
        let sdk = DevEcoSdk::new(self.env.resolve(sdk_home));

        let pivot = node_modules_path.parent();

        let metro = options.metro.resolved().map(|m| MetroPortForwardInput {
            port: m.port.unwrap_or(DEFAULT_METRO_PORT),
        });

        let codegen_args = match options.codegen {
            Subsystem::Disabled => None,
            ref codegen => {
                let config = codegen.resolved().unwrap_or_default();
                Some(self.derive_codegen_args(config, &pivot))
            }
        };

        let autolinking_args = options.autolinking.resolved().map(|config| AutolinkingArgs {
            harmony_project_path: cwd.relative_display(&pivot),
            node_modules_path: node_modules_path.to_string(),
            cmake_autolink_path_relative_to_harmony: config
                .cmake_autolink_path
                .unwrap_or_else(|| DEFAULT_CMAKE_AUTOLINK_PATH.to_string()),
            cpp_rnoh_packages_factory_path_relative_to_harmony: config
                .cpp_packages_factory_path
                .unwrap_or_else(|| DEFAULT_CPP_PACKAGES_FACTORY_PATH.to_string()),
            ets_rnoh_packages_factory_path_relative_to_harmony: config
                .ets_packages_factory_path
                .unwrap_or_else(|| DEFAULT_ETS_PACKAGES_FACTORY_PATH.to_string()),
            oh_package_path_relative_to_harmony: config
                .oh_package_path
                .unwrap_or_else(|| DEFAULT_OH_PACKAGE_PATH.to_string()),
            exclude_npm_packages: quoted_package_list(config.exclude_npm_packages.as_deref()),
            include_npm_packages: quoted_package_list(config.include_npm_packages.as_deref()),
        });

        Ok(SyncInput {
            harmony_project_path: cwd.clone(),
            node_modules_path,
            pivot,
            sdk,
            metro,
            codegen_args,
            autolinking_args,
        })
    }

    /// Rebase every codegen path onto the pivot. `etsOutputPath` absorbs
    /// `rnohModulePath`, which is then dropped.
    fn derive_codegen_args(&self, config: CodegenConfig, pivot: &AbsolutePath) -> CodegenConfig {
        let rebase = |path: Option<&str>, default: &str| {
            self.env
                .resolve(path.filter(|p| !p.is_empty()).unwrap_or(default))
                .relative_display(pivot)
        };

        let ets_source =
            non_empty(&config.ets_output_path).or(non_empty(&config.rnoh_module_path));

        CodegenConfig {
            project_root_path: Some(rebase(
                config.project_root_path.as_deref(),
                DEFAULT_PROJECT_ROOT_PATH,
            )),
            cpp_output_path: Some(rebase(
                config.cpp_output_path.as_deref(),
                DEFAULT_CPP_OUTPUT_PATH,
            )),
            ets_output_path: Some(rebase(ets_source, DEFAULT_ETS_OUTPUT_PATH)),
            rnoh_module_path: None,
            debug: config.debug,
            no_safety_check: config.no_safety_check,
        }
    }

    fn run_subtasks(&self, input: &SyncInput) -> Result<(), SyncError> {
        let subtasks: [Box<dyn Subtask + '_>; 4] = [
            Box::new(CheckPluginVersionSubtask::new(
                input.harmony_project_path.clone(),
            )),
            Box::new(MetroPortForwardSubtask::new(
                self.executor,
                input.sdk.clone(),
                input.harmony_project_path.clone(),
                input.metro,
            )),
            Box::new(CodegenSubtask::new(
                self.executor,
                input.pivot.clone(),
                input.codegen_args.clone(),
            )),
            Box::new(AutolinkingSubtask::new(
                self.executor,
                input.pivot.clone(),
                input.autolinking_args.clone(),
            )),
        ];

        for subtask in &subtasks {
            tracing::debug!("running subtask `{}`", subtask.name());
            subtask.run().map_err(|source| SyncError::Subtask {
                subtask: subtask.name(),
                source,
            })?;
        }
        Ok(())
    }
}

/// `["a", "b"]` -> `"a;b"` (with the quotes); empty -> `None`.
/// An empty path counts as unset.
fn non_empty(path: &Option<String>) -> Option<&str> {
    path.as_deref().filter(|p| !p.is_empty())
}

fn quoted_package_list(packages: Option<&[String]>) -> Option<String> {
    let joined = packages?.join(";");
    if joined.is_empty() {
        None
    } else {
        Some(format!("\"{}\"", joined))
    }
}
