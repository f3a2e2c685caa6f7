//! rnoh - build orchestration for React Native on OpenHarmony
//!
//! This crate provides the library behind the `rnoh` CLI: the sync pipeline
//! the build plugin runs (codegen, autolinking, version check, port
//! forwarding), JS bundling with asset copying, and device deployment.

pub mod core;
pub mod ops;
pub mod util;

/// Test doubles for unit tests.
///
/// Only compiled for tests. Provides a recording command executor and an
/// in-process bundler.
#[cfg(test)]
pub mod test_support;

pub use core::{AbsolutePath, AssetDescriptor, ModuleOptions, Subsystem};
pub use util::context::Environment;
