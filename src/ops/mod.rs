//! High-level operations.
//!
//! One module per command: `sync` for the build-plugin pipeline, `bundle`
//! for `bundle-harmony`, `run` for `run-harmony`.

pub mod assets;
pub mod bundle;
pub mod run;
pub mod sdk;
pub mod sync;

pub use assets::{copy_assets, CopyPlan};
pub use bundle::{bundle, BundleOptions, BundleReport, Bundler, MetroBundler};
pub use run::{run_harmony, RunOptions};
pub use sdk::DevEcoSdk;
pub use sync::{SyncError, SyncTask, ValidationError};
