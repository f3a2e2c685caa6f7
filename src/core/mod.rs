//! Core value types shared by every operation.

pub mod abs_path;
pub mod asset;
pub mod options;

pub use abs_path::AbsolutePath;
pub use asset::AssetDescriptor;
pub use options::{
    AutolinkingConfig, CodegenConfig, MetroConfig, ModuleOptions, OptionName, Subsystem,
};
