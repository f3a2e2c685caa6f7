//! Command implementations

pub mod bundle_harmony;
pub mod completions;
pub mod run_harmony;
pub mod sync;
