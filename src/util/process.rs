//! Subprocess execution utilities.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};
use std::thread;

use anyhow::{Context, Result};
use thiserror::Error;

/// A subprocess that ran but did not succeed.
#[derive(Debug, Error)]
#[error("`{command}` failed with exit code {code:?}\n{stderr}")]
pub struct ProcessError {
    pub command: String,
    pub code: Option<i32>,
    pub stderr: String,
}

/// Builder for subprocess execution.
#[derive(Debug, Clone)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
    stdin: Option<Vec<u8>>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
            stdin: None,
        }
    }

    /// A builder that runs `line` through the platform shell.
    pub fn shell_line(line: impl Into<String>) -> Self {
        if cfg!(windows) {
            ProcessBuilder::new("cmd").args(["/C".to_string(), line.into()])
        } else {
            ProcessBuilder::new("sh").args(["-c".to_string(), line.into()])
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Set stdin data.
    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Build the Command.
    pub(crate) fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Execute the command and wait for completion.
    pub fn exec(&self) -> Result<Output> {
        let mut cmd = self.build_command();

        if self.stdin.is_some() {
            cmd.stdin(Stdio::piped());
        }
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        if let Some(ref stdin_data) = self.stdin {
            use std::io::Write;
            if let Some(mut stdin) = child.stdin.take() {
                stdin.write_all(stdin_data)?;
            }
        }

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        Ok(output)
    }

    /// Execute and require success.
    pub fn exec_and_check(&self) -> Result<Output> {
        let output = self.exec()?;
        if !output.status.success() {
            return Err(self.failure(output.status, &output.stderr).into());
        }
        Ok(output)
    }

    /// Execute, handing each stdout and stderr line to the callbacks as it
    /// arrives. Returns the full stdout on success.
    pub fn exec_streaming(
        &self,
        mut on_stdout: impl FnMut(&str),
        on_stderr: impl FnMut(&str) + Send,
    ) -> Result<String> {
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd
            .spawn()
            .with_context(|| format!("failed to spawn `{}`", self.program.display()))?;

        let stdout = child.stdout.take().context("child stdout was not captured")?;
        let stderr = child.stderr.take().context("child stderr was not captured")?;

        let (collected_out, collected_err) = thread::scope(|scope| {
            let err_reader = scope.spawn(move || read_lines(stderr, on_stderr));
            let out = read_lines(stdout, &mut on_stdout);
            let err = err_reader.join().unwrap_or_default();
            (out, err)
        });

        let status = child
            .wait()
            .with_context(|| format!("failed to wait for `{}`", self.program.display()))?;

        if !status.success() {
            return Err(self.failure(status, collected_err.as_bytes()).into());
        }
        Ok(collected_out)
    }

    /// Display the command for error messages.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    fn failure(&self, status: ExitStatus, stderr: &[u8]) -> ProcessError {
        ProcessError {
            command: self.display_command(),
            code: status.code(),
            stderr: String::from_utf8_lossy(stderr).into_owned(),
        }
    }
}

fn read_lines(stream: impl Read, mut on_line: impl FnMut(&str)) -> String {
    let mut collected = String::new();
    for line in BufReader::new(stream).lines().map_while(|l| l.ok()) {
        on_line(&line);
        collected.push_str(&line);
        collected.push('\n');
    }
    collected
}

/// Runs a named tool with an options object, from a given directory.
///
/// This is the seam the sync subtasks talk to; tests substitute a
/// recording implementation.
pub trait CommandExecutor {
    /// Run `command` with `args` marshalled to CLI flags, in `cwd`.
    /// Returns captured stdout.
    fn run(&self, command: &str, args: &serde_json::Value, cwd: &Path) -> Result<String>;

    /// Run a complete command line, handing each stdout line to `on_line`.
    ///
    /// The default implementation reports the lines after the command
    /// returns.
    fn run_streaming(&self, command: &str, cwd: &Path, on_line: &mut dyn FnMut(&str)) -> Result<String> {
        let output = self.run(command, &serde_json::Value::Null, cwd)?;
        output.lines().for_each(|line| on_line(line));
        Ok(output)
    }
}

/// Executes commands through the platform shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellExecutor;

impl CommandExecutor for ShellExecutor {
    fn run(&self, command: &str, args: &serde_json::Value, cwd: &Path) -> Result<String> {
        let line = command_line(command, args);
        tracing::debug!("running `{}` in {}", line, cwd.display());

        let output = ProcessBuilder::shell_line(line).cwd(cwd).exec_and_check()?;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn run_streaming(&self, command: &str, cwd: &Path, on_line: &mut dyn FnMut(&str)) -> Result<String> {
        tracing::debug!("running `{}` in {}", command, cwd.display());
        ProcessBuilder::shell_line(command)
            .cwd(cwd)
            .exec_streaming(|line| on_line(line), |line| tracing::debug!("{}", line))
    }
}

/// Render `command` followed by `args` as CLI flags.
///
/// Keys become kebab-case long flags. Strings and numbers follow the flag,
/// quoted for the shell when needed. `true` emits the bare flag, arrays are
/// joined by `;`, and `false`/`null` emit nothing.
pub fn command_line(command: &str, args: &serde_json::Value) -> String {
    let mut parts = vec![command.to_string()];
    parts.extend(args_to_flags(args));
    parts.join(" ")
}

pub fn args_to_flags(args: &serde_json::Value) -> Vec<String> {
    use serde_json::Value;

    let Some(map) = args.as_object() else {
        return Vec::new();
    };

    let mut flags = Vec::new();
    for (key, value) in map {
        let flag = format!("--{}", kebab_case(key));
        match value {
            Value::Null | Value::Bool(false) => {}
            Value::Bool(true) => flags.push(flag),
            Value::String(s) => {
                flags.push(flag);
                flags.push(shell_quote(s));
            }
            Value::Number(n) => {
                flags.push(flag);
                flags.push(n.to_string());
            }
            Value::Array(items) => {
                let joined = items
                    .iter()
                    .map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(";");
                flags.push(flag);
                flags.push(shell_quote(&joined));
            }
            Value::Object(_) => {
                flags.push(flag);
                flags.push(value.to_string());
            }
        }
    }
    flags
}

/// Quote `value` for the platform shell.
///
/// Plain words and values that already carry their own quotes pass through.
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./:=@,+%".contains(c));
    let pre_quoted = value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')));
    if plain || pre_quoted {
        return value.to_string();
    }

    if cfg!(windows) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// `cppRnohPackagesFactoryPathRelativeToHarmony` ->
/// `cpp-rnoh-packages-factory-path-relative-to-harmony`
fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Find Node.js.
pub fn find_node() -> Option<PathBuf> {
    find_executable("node")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[cfg(unix)]
    #[test]
    fn test_process_builder() {
        let output = ProcessBuilder::new("echo").arg("hello").exec().unwrap();

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("hello"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_and_check_reports_stderr() {
        let err = ProcessBuilder::shell_line("echo boom >&2; exit 3")
            .exec_and_check()
            .unwrap_err();
        let err = err.downcast::<ProcessError>().unwrap();
        assert_eq!(err.code, Some(3));
        assert!(err.stderr.contains("boom"));
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_streaming_delivers_lines() {
        let mut lines = Vec::new();
        let out = ProcessBuilder::shell_line("echo one; echo two")
            .exec_streaming(|l| lines.push(l.to_string()), |_| {})
            .unwrap();
        assert_eq!(lines, vec!["one", "two"]);
        assert_eq!(out, "one\ntwo\n");
    }

    #[test]
    fn test_display_command() {
        let pb = ProcessBuilder::new("hdc").args(["rport", "tcp:8081", "tcp:8081"]);
        assert_eq!(pb.display_command(), "hdc rport tcp:8081 tcp:8081");
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("harmonyProjectPath"), "harmony-project-path");
        assert_eq!(kebab_case("debug"), "debug");
    }

    #[test]
    fn test_args_to_flags() {
        let flags = args_to_flags(&json!({
            "etsOutputPath": "harmony",
            "debug": true,
            "noSafetyCheck": false,
            "port": 8081,
            "skipped": null,
            "packages": ["a", "b"]
        }));
        // serde_json maps iterate in key order
        assert_eq!(
            flags,
            vec![
                "--debug",
                "--ets-output-path",
                "harmony",
                "--packages",
                shell_quote("a;b").as_str(),
                "--port",
                "8081",
            ]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("harmony/entry"), "harmony/entry");
        assert_eq!(shell_quote("./my gen"), "'./my gen'");
        assert_eq!(shell_quote("a;b"), "'a;b'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote(""), "''");
        assert_eq!(shell_quote("\"a;b\""), "\"a;b\"");
    }

    #[cfg(unix)]
    #[test]
    fn test_path_with_spaces_stays_one_argument() {
        let line = command_line("printf '%s\\n'", &json!({ "cppOutputPath": "./my gen; echo x" }));
        let out = ProcessBuilder::shell_line(line).exec_and_check().unwrap();
        assert_eq!(
            String::from_utf8_lossy(&out.stdout),
            "--cpp-output-path\n./my gen; echo x\n"
        );
    }

    #[test]
    fn test_command_line_keeps_quoted_values() {
        let line = command_line(
            "node_modules/.bin/react-native link-harmony",
            &json!({ "excludeNpmPackages": "\"a;b\"" }),
        );
        assert_eq!(
            line,
            "node_modules/.bin/react-native link-harmony --exclude-npm-packages \"a;b\""
        );
    }
}
