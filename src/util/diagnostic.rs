//! User-friendly diagnostic messages.
//!
//! A diagnostic states what happened and, where possible, what the user can
//! do about it.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Appended to every `run-harmony` failure.
    pub const TRY_DEVECO: &str = "Try building and running the app from DevEco Studio.";

    /// When the SDK location is unknown.
    pub const SET_SDK_HOME_MACOS: &str = "On MacOS, the contents directory is typically located at: /Applications/DevEco-Studio.app/Contents/sdk. Set this path as the value of DEVECO_SDK_HOME";

    pub const SET_SDK_HOME: &str = "Locate the installation directory of DevEco Studio, and set its 'sdk' subdirectory as the value of DEVECO_SDK_HOME environment variable.";

    /// When no device is reachable.
    pub const CONNECT_DEVICE: &str = "Please connect your HarmonyOS device or open the simulator.";
}

/// An error message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// What happened
    pub message: String,
    /// Additional context lines
    pub context: Vec<String>,
    /// What the user can do
    pub suggestions: Vec<String>,
    /// Related file
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };
        output.push_str(&format!("{}: {}\n", label, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  -> {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// An error that already knows how to explain itself to the user.
///
/// Travels through `anyhow` and is recovered with `downcast_ref` at the
/// command boundary.
#[derive(Debug, Error)]
#[error("{}", .0.message)]
pub struct DiagnosticError(pub Diagnostic);

impl From<Diagnostic> for DiagnosticError {
    fn from(diag: Diagnostic) -> Self {
        DiagnosticError(diag)
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}
