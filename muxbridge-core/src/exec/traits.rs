//! CommandExecutor trait and the server-type dispatcher

use std::time::Duration;

use async_trait::async_trait;

use super::{LocalExecutor, SshExecutor};
use crate::error::Result;
use crate::servers::ServerDefinition;

/// Captured result of a one-shot command
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was killed by a signal or never reported
    pub exit_status: Option<i32>,
    /// Completion was inferred from a verification command
    pub verified: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_status == Some(0)
    }
}

/// Runs a command line against a server
///
/// Implementations return [`crate::BridgeError::CommandTimeout`] when the
/// command does not complete within `timeout`, and
/// [`crate::BridgeError::Connection`] when the server cannot be reached.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    async fn run(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput>;
}

/// Dispatches to [`LocalExecutor`] or [`SshExecutor`] by server auth type
pub struct ServerExecutor {
    local: LocalExecutor,
    remote: SshExecutor,
}

impl ServerExecutor {
    pub fn new(ssh_connect_timeout: Duration) -> Self {
        Self {
            local: LocalExecutor::new(),
            remote: SshExecutor::new(ssh_connect_timeout),
        }
    }
}

#[async_trait]
impl CommandExecutor for ServerExecutor {
    async fn run(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        if server.is_local() {
            self.local.run(server, command, timeout).await
        } else {
            self.remote.run(server, command, timeout).await
        }
    }
}
