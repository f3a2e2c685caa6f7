//! Invokes `codegen-harmony`, which turns interface specs into native glue.

use anyhow::{Context, Result};

use crate::core::{AbsolutePath, CodegenConfig};
use crate::ops::sync::subtask::Subtask;
use crate::ops::sync::react_native_cli;
use crate::util::CommandExecutor;

pub struct CodegenSubtask<'a> {
    executor: &'a dyn CommandExecutor,
    pivot: AbsolutePath,
    input: Option<CodegenConfig>,
}

impl<'a> CodegenSubtask<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        pivot: AbsolutePath,
        input: Option<CodegenConfig>,
    ) -> Self {
        CodegenSubtask {
            executor,
            pivot,
            input,
        }
    }
}

impl Subtask for CodegenSubtask<'_> {
    fn name(&self) -> &'static str {
        "codegen"
    }

    fn run(&self) -> Result<()> {
        let Some(ref config) = self.input else {
            tracing::warn!("[codegen] skipped");
            return Ok(());
        };

        let args = serde_json::to_value(config).context("failed to serialize codegen config")?;
        let output = self.executor.run(
            &react_native_cli("codegen-harmony"),
            &args,
            self.pivot.as_path(),
        )?;
        tracing::info!("[codegen]\n{}", output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{MockExecutor, MockProcessOutput};
    use tempfile::TempDir;

    #[test]
    fn test_skip_runs_nothing() {
        let tmp = TempDir::new().unwrap();
        let exec = MockExecutor::new();
        let task = CodegenSubtask::new(&exec, AbsolutePath::new(tmp.path()).unwrap(), None);

        task.run().unwrap();
        assert!(exec.calls().is_empty());
    }

    #[test]
    fn test_runs_generator_in_pivot() {
        let tmp = TempDir::new().unwrap();
        let exec = MockExecutor::new();
        exec.expect_contains("codegen-harmony", MockProcessOutput::success("generated 3 files"));

        let config = CodegenConfig {
            ets_output_path: Some("harmony".into()),
            cpp_output_path: Some("harmony/entry/src/main/cpp/generated".into()),
            ..Default::default()
        };
        let task = CodegenSubtask::new(&exec, AbsolutePath::new(tmp.path()).unwrap(), Some(config));
        task.run().unwrap();

        let calls = exec.recorded();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].cwd, tmp.path());
        assert_eq!(calls[0].args["etsOutputPath"], "harmony");
        assert!(calls[0].line.contains("--ets-output-path harmony"));
    }

    #[test]
    fn test_generator_failure_propagates() {
        let tmp = TempDir::new().unwrap();
        let exec = MockExecutor::new();
        exec.expect_contains("codegen-harmony", MockProcessOutput::failure(1, "bad spec"));

        let task = CodegenSubtask::new(
            &exec,
            AbsolutePath::new(tmp.path()).unwrap(),
            Some(CodegenConfig::default()),
        );
        let err = task.run().unwrap_err();
        assert!(format!("{:#}", err).contains("bad spec"));
    }
}
