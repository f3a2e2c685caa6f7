//! Shared utilities

pub mod config;
pub mod context;
pub mod diagnostic;
pub mod fs;
pub mod process;
pub mod shell;

pub use context::Environment;
pub use diagnostic::{Diagnostic, DiagnosticError};
pub use process::{CommandExecutor, ProcessBuilder, ProcessError, ShellExecutor};
pub use shell::Shell;
