//! Test doubles for the process and bundler seams.
//!
//! ```rust,ignore
//! let exec = MockExecutor::new();
//! exec.expect_contains("codegen-harmony", MockProcessOutput::success("ok"));
//! SyncTask::new(&exec, &env).run(&options)?;
//! assert!(exec.calls()[0].contains("codegen-harmony"));
//! ```

pub mod bundler;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Result};

use crate::util::process::{command_line, CommandExecutor, ProcessError};

pub use bundler::FakeBundler;

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Match if the rendered command line contains substring.
    Contains(String),
    /// Match using a regex pattern.
    Regex(String),
}

impl CommandPattern {
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Contains(s) => cmd.contains(s),
            CommandPattern::Regex(pattern) => regex::Regex::new(pattern)
                .map(|re| re.is_match(cmd))
                .unwrap_or(false),
        }
    }
}

#[derive(Debug, Clone)]
struct CommandExpectation {
    pattern: CommandPattern,
    output: MockProcessOutput,
}

/// One call seen by [`MockExecutor`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// Command followed by its marshalled flags.
    pub line: String,
    pub command: String,
    pub args: serde_json::Value,
    pub cwd: PathBuf,
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<CommandExpectation>,
    calls: Vec<RecordedCall>,
    default_output: Option<MockProcessOutput>,
}

/// Recording [`CommandExecutor`].
///
/// The first matching expectation wins; unmatched commands fall back to the
/// default output, or fail when none is set.
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    pub fn new() -> Self {
        MockExecutor::default()
    }

    /// Add an expectation for a command line containing a substring.
    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::Contains(substring.to_string()), output)
    }

    /// Add an expectation for a command line matching a regex.
    pub fn expect_regex(&self, pattern: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::Regex(pattern.to_string()), output)
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        self.lock().default_output = Some(output);
        self
    }

    /// Rendered command lines, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.iter().map(|c| c.line.clone()).collect()
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    fn push(&self, pattern: CommandPattern, output: MockProcessOutput) -> &Self {
        self.lock()
            .expectations
            .push(CommandExpectation { pattern, output });
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CommandExecutor for MockExecutor {
    fn run(&self, command: &str, args: &serde_json::Value, cwd: &Path) -> Result<String> {
        let line = command_line(command, args);
        let mut state = self.lock();
        state.calls.push(RecordedCall {
            line: line.clone(),
            command: command.to_string(),
            args: args.clone(),
            cwd: cwd.to_path_buf(),
        });

        let output = state
            .expectations
            .iter()
            .find(|e| e.pattern.matches(&line))
            .map(|e| e.output.clone())
            .or_else(|| state.default_output.clone());

        let Some(output) = output else {
            bail!("unexpected command: {}", line);
        };

        if output.status != 0 {
            return Err(ProcessError {
                command: line,
                code: Some(output.status),
                stderr: output.stderr,
            }
            .into());
        }
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mock_executor_matches_and_records() {
        let exec = MockExecutor::new();
        exec.expect_contains("hdc list", MockProcessOutput::success("device1"));
        exec.expect_regex(r"rport tcp:\d+", MockProcessOutput::failure(1, "no device"));

        let out = exec.run("hdc list targets", &json!(null), Path::new("/tmp")).unwrap();
        assert_eq!(out, "device1");

        let err = exec
            .run("hdc rport tcp:8081 tcp:8081", &json!(null), Path::new("/tmp"))
            .unwrap_err();
        assert!(err.downcast_ref::<ProcessError>().is_some());

        assert!(exec.run("unknown", &json!(null), Path::new("/tmp")).is_err());
        assert_eq!(exec.calls().len(), 3);
    }
}
