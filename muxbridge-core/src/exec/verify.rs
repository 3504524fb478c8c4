//! Verification fallback for commands whose completion is not signalled
//!
//! Some remote commands (notably ones that spawn a background server, like
//! `tmux new-session -d` starting the tmux server) can leave the exec
//! channel open after the work is done. When the primary command times out,
//! a second idempotent command checks the expected post-condition instead.

use std::time::Duration;

use tracing::{info, warn};

use super::traits::{CommandExecutor, CommandOutput};
use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;

/// Post-condition check run after a primary command times out
#[derive(Debug, Clone)]
pub struct Verification {
    /// Idempotent command whose exit status reveals the post-condition
    pub command: String,
    /// Whether the post-condition holds when `command` exits zero
    pub holds_on_success: bool,
}

impl Verification {
    /// Post-condition holds when `command` succeeds (resource exists)
    pub fn exists(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            holds_on_success: true,
        }
    }

    /// Post-condition holds when `command` fails (resource is gone)
    pub fn gone(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            holds_on_success: false,
        }
    }
}

/// Run `command`, falling back to `verification` if it times out
///
/// Returns [`BridgeError::CommandTimeout`] only if the verification step also
/// fails to confirm the post-condition.
pub async fn run_verified(
    executor: &dyn CommandExecutor,
    server: &ServerDefinition,
    command: &str,
    verification: &Verification,
    timeout: Duration,
) -> Result<CommandOutput> {
    let elapsed = match executor.run(server, command, timeout).await {
        Err(BridgeError::CommandTimeout(elapsed)) => elapsed,
        other => return other,
    };

    warn!(
        server = %server.name,
        command = %command,
        verify = %verification.command,
        "Command timed out, verifying post-condition"
    );

    match executor.run(server, &verification.command, timeout).await {
        Ok(output) if output.success() == verification.holds_on_success => {
            info!(server = %server.name, command = %command, "Post-condition verified");
            Ok(CommandOutput {
                stdout: output.stdout,
                stderr: String::new(),
                exit_status: Some(0),
                verified: true,
            })
        }
        Ok(_) | Err(BridgeError::CommandTimeout(_)) => Err(BridgeError::CommandTimeout(elapsed)),
        Err(e) => Err(e),
    }
}
