//! Forwards the dev-server port from the device to this machine so a
//! debug build can reach Metro.

use std::path::PathBuf;

use anyhow::Result;

use crate::core::AbsolutePath;
use crate::ops::sdk::{shell_path, DevEcoSdk};
use crate::ops::sync::subtask::Subtask;
use crate::util::CommandExecutor;

pub const DEFAULT_METRO_PORT: u16 = 8081;

/// Resolved port-forward settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetroPortForwardInput {
    pub port: u16,
}

pub struct MetroPortForwardSubtask<'a> {
    executor: &'a dyn CommandExecutor,
    sdk: DevEcoSdk,
    cwd: AbsolutePath,
    input: Option<MetroPortForwardInput>,
}

impl<'a> MetroPortForwardSubtask<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        sdk: DevEcoSdk,
        cwd: AbsolutePath,
        input: Option<MetroPortForwardInput>,
    ) -> Self {
        MetroPortForwardSubtask {
            executor,
            sdk,
            cwd,
            input,
        }
    }

    fn forward(&self, hdc: PathBuf, port: u16) -> Result<String> {
        let command = format!("{} rport tcp:{} tcp:{}", shell_path(&hdc), port, port);
        self.executor
            .run(&command, &serde_json::Value::Null, self.cwd.as_path())
    }
}

impl Subtask for MetroPortForwardSubtask<'_> {
    fn name(&self) -> &'static str {
        "metro"
    }

    /// A missing device is normal during an IDE sync, so failures are
    /// reported and swallowed.
    fn run(&self) -> Result<()> {
        let Some(input) = self.input else {
            tracing::warn!("[metro] skipped");
            return Ok(());
        };

        let result = self
            .sdk
            .hdc()
            .and_then(|hdc| self.forward(hdc, input.port));

        match result {
            Ok(output) => tracing::info!("[metro] forwarded tcp:{}\n{}", input.port, output),
            Err(err) => tracing::warn!(
                "[metro] could not forward port {}: {:#}",
                input.port,
                err
            ),
        }
        Ok(())
    }
}
