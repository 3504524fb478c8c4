//! Session and window operations against any registered server

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::command::{TmuxCommands, validate_session_name};
use super::parse::{Session, Window, parse_sessions, parse_windows};
use crate::error::{BridgeError, Result};
use crate::exec::{CommandExecutor, CommandOutput, Verification, run_verified};
use crate::servers::ServerDefinition;

/// stderr fragments tmux prints when there is simply nothing to list
const EMPTY_SERVER_MARKERS: [&str; 3] = ["no server running", "no sessions", "error connecting"];

/// Fresh-query view of tmux on every server
///
/// Nothing is cached; every call runs a command through the executor.
pub struct Multiplexer {
    executor: Arc<dyn CommandExecutor>,
    commands: TmuxCommands,
    timeout: Duration,
}

impl Multiplexer {
    pub fn new(executor: Arc<dyn CommandExecutor>, commands: TmuxCommands, timeout: Duration) -> Self {
        Self {
            executor,
            commands,
            timeout,
        }
    }

    pub fn commands(&self) -> &TmuxCommands {
        &self.commands
    }

    pub fn executor(&self) -> Arc<dyn CommandExecutor> {
        Arc::clone(&self.executor)
    }

    async fn run(&self, server: &ServerDefinition, command: &str) -> Result<CommandOutput> {
        debug!(server = %server.name, command = %command, "Running tmux command");
        self.executor.run(server, command, self.timeout).await
    }

    pub async fn list_sessions(&self, server: &ServerDefinition) -> Result<Vec<Session>> {
        let output = self.run(server, &self.commands.list_sessions(server)).await?;
        if output.success() {
            return Ok(parse_sessions(&output.stdout, &server.id));
        }
        if EMPTY_SERVER_MARKERS
            .iter()
            .any(|marker| output.stderr.contains(marker))
        {
            return Ok(Vec::new());
        }
        Err(failed(output))
    }

    /// Exact-name existence check
    pub async fn has_session(&self, server: &ServerDefinition, name: &str) -> Result<bool> {
        let output = self.run(server, &self.commands.has_session(server, name)).await?;
        Ok(output.success())
    }

    /// Create a detached session, returning its name
    ///
    /// `name` defaults to `term-<unix millis>`. A hung create is resolved by
    /// checking whether the session exists afterwards.
    pub async fn create_session(
        &self,
        server: &ServerDefinition,
        name: Option<&str>,
        command: Option<&str>,
    ) -> Result<String> {
        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("term-{}", chrono::Utc::now().timestamp_millis()),
        };
        validate_session_name(&name)?;

        let line = self.commands.new_session(server, &name, command);
        let verification = Verification::exists(self.commands.has_session(server, &name));
        let output = run_verified(self.executor.as_ref(), server, &line, &verification, self.timeout)
            .await?;

        if !output.success() {
            if output.stderr.contains("duplicate session") {
                return Err(BridgeError::Validation(format!(
                    "Session \"{}\" already exists",
                    name
                )));
            }
            return Err(failed(output));
        }

        info!(
            server = %server.name,
            session = %name,
            verified = output.verified,
            "Created tmux session"
        );
        Ok(name)
    }

    pub async fn kill_session(&self, server: &ServerDefinition, name: &str) -> Result<()> {
        let line = self.commands.kill_session(server, name);
        let verification = Verification::gone(self.commands.has_session(server, name));
        let output = run_verified(self.executor.as_ref(), server, &line, &verification, self.timeout)
            .await?;

        if !output.success() {
            return Err(session_error(output, name));
        }
        info!(server = %server.name, session = %name, "Killed tmux session");
        Ok(())
    }

    pub async fn list_windows(&self, server: &ServerDefinition, name: &str) -> Result<Vec<Window>> {
        let output = self.run(server, &self.commands.list_windows(server, name)).await?;
        if !output.success() {
            return Err(session_error(output, name));
        }
        Ok(parse_windows(&output.stdout))
    }

    pub async fn kill_window(&self, server: &ServerDefinition, name: &str, index: u32) -> Result<()> {
        let output = self
            .run(server, &self.commands.kill_window(server, name, index))
            .await?;
        if output.success() {
            info!(server = %server.name, session = %name, index, "Killed tmux window");
            return Ok(());
        }
        if output.stderr.contains("can't find window") {
            return Err(BridgeError::WindowNotFound {
                session: name.to_string(),
                index,
            });
        }
        Err(session_error(output, name))
    }

    /// `tmux -V` output, or `None` if tmux is not installed
    ///
    /// Connection failures still propagate, so this doubles as a reachability check.
    pub async fn version(&self, server: &ServerDefinition) -> Result<Option<String>> {
        let output = self.run(server, &self.commands.version(server)).await?;
        if output.success() {
            Ok(Some(output.stdout.trim().to_string()))
        } else {
            Ok(None)
        }
    }

    /// Sessions of every server, queried concurrently
    ///
    /// A server that fails contributes nothing; its error is only logged.
    pub async fn list_all(&self, servers: &[ServerDefinition]) -> Vec<Session> {
        let results = join_all(servers.iter().map(|server| self.list_sessions(server))).await;

        servers
            .iter()
            .zip(results)
            .flat_map(|(server, result)| match result {
                Ok(sessions) => sessions,
                Err(e) => {
                    warn!(server = %server.name, error = %e, "Skipping server in session listing");
                    Vec::new()
                }
            })
            .collect()
    }
}

fn failed(output: CommandOutput) -> BridgeError {
    BridgeError::CommandFailed {
        status: output.exit_status.unwrap_or(-1),
        stderr: output.stderr.trim().to_string(),
    }
}

fn session_error(output: CommandOutput, name: &str) -> BridgeError {
    if output.stderr.contains("can't find session") || output.stderr.contains("no server running")
    {
        BridgeError::SessionNotFound(name.to_string())
    } else {
        failed(output)
    }
}
