//! Sync pipeline error types.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::OptionName;

/// An option failed validation before any tool was started.
#[derive(Debug, Clone, Error, MietteDiagnostic)]
#[error("ValidationError: {option} - {message}")]
#[diagnostic(
    code(rnoh::sync::validation),
    help("Check the options passed to the module plugin")
)]
pub struct ValidationError {
    pub option: OptionName,
    pub message: String,
}

impl ValidationError {
    pub fn new(option: OptionName, message: impl Into<String>) -> Self {
        ValidationError {
            option,
            message: message.into(),
        }
    }
}

/// Failure of a sync run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("[{subtask}] failed")]
    Subtask {
        subtask: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl SyncError {
    /// The offending option, for validation failures.
    pub fn validation_option(&self) -> Option<OptionName> {
        match self {
            SyncError::Validation(err) => Some(err.option),
            SyncError::Subtask { .. } => None,
        }
    }
}
