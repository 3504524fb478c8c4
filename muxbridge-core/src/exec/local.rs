//! Subprocess executor for the local server

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::traits::{CommandExecutor, CommandOutput};
use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;

/// Runs command lines through `sh -c` on this host
pub struct LocalExecutor {
    shell: String,
}

impl LocalExecutor {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    async fn run(
        &self,
        _server: &ServerDefinition,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        debug!(command = %command, "Running local command");

        let child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| BridgeError::CommandTimeout(timeout))??;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_status: output.status.code(),
            verified: false,
        })
    }
}
