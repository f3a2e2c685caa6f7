//! Module-plugin options.
//!
//! Options arrive from the build-system plugin host as a JSON-like document.
//! Each subsystem (`metro`, `codegen`, `autolinking`) has three states:
//! disabled (`null` or `false`), defaulted (key absent or `true`), or an
//! explicit configuration object.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

/// Tri-state configuration for an optional subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Subsystem<T> {
    /// Explicitly switched off; the subsystem's subtask is skipped.
    Disabled,
    /// Not configured; the subsystem runs with default settings.
    #[default]
    Default,
    /// Configured by the user.
    Explicit(T),
}

impl<T: Default + Clone> Subsystem<T> {
    /// The effective configuration, or `None` when disabled.
    pub fn resolved(&self) -> Option<T> {
        match self {
            Subsystem::Disabled => None,
            Subsystem::Default => Some(T::default()),
            Subsystem::Explicit(config) => Some(config.clone()),
        }
    }
}

impl<T> Subsystem<T> {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Subsystem::Disabled)
    }

    pub fn explicit(&self) -> Option<&T> {
        match self {
            Subsystem::Explicit(config) => Some(config),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSubsystem<T> {
    Flag(bool),
    Config(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Subsystem<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // An absent key never reaches here; `#[serde(default)]` yields `Default`.
        Ok(match Option::<RawSubsystem<T>>::deserialize(deserializer)? {
            None | Some(RawSubsystem::Flag(false)) => Subsystem::Disabled,
            Some(RawSubsystem::Flag(true)) => Subsystem::Default,
            Some(RawSubsystem::Config(config)) => Subsystem::Explicit(config),
        })
    }
}

/// Options accepted by the sync pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModuleOptions {
    /// Location of the JS project's `node_modules`.
    /// Defaults to `<cwd>/../node_modules`.
    pub node_modules_path: Option<PathBuf>,
    pub metro: Subsystem<MetroConfig>,
    pub codegen: Subsystem<CodegenConfig>,
    pub autolinking: Subsystem<AutolinkingConfig>,
}

/// Dev-server settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetroConfig {
    pub port: Option<u16>,
}

/// Settings forwarded to `codegen-harmony`.
///
/// Serialized field names are the generator's option names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CodegenConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rnoh_module_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ets_output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpp_output_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_safety_check: Option<bool>,
}

/// Settings for the native-package linker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutolinkingConfig {
    pub oh_package_path: Option<String>,
    #[serde(alias = "etsRNOHPackagesFactoryPath")]
    pub ets_packages_factory_path: Option<String>,
    #[serde(alias = "cppRNOHPackagesFactoryPath")]
    pub cpp_packages_factory_path: Option<String>,
    pub cmake_autolink_path: Option<String>,
    pub exclude_npm_packages: Option<Vec<String>>,
    pub include_npm_packages: Option<Vec<String>>,
}

/// Names of the top-level options, used to label validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionName {
    NodeModulesPath,
    Metro,
    Codegen,
    Autolinking,
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OptionName::NodeModulesPath => "nodeModulesPath",
            OptionName::Metro => "metro",
            OptionName::Codegen => "codegen",
            OptionName::Autolinking => "autolinking",
        };
        f.write_str(name)
    }
}
