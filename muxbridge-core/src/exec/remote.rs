//! SSH exec-channel executor for remote servers

use std::time::Duration;

use async_trait::async_trait;
use russh::ChannelMsg;
use tracing::{debug, warn};

use super::traits::{CommandExecutor, CommandOutput};
use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;
use crate::ssh;

/// Runs command lines over a fresh SSH connection per call
pub struct SshExecutor {
    connect_timeout: Duration,
}

impl SshExecutor {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl CommandExecutor for SshExecutor {
    async fn run(
        &self,
        server: &ServerDefinition,
        command: &str,
        timeout: Duration,
    ) -> Result<CommandOutput> {
        let handle = ssh::connect(server, self.connect_timeout).await?;
        debug!(addr = %server.address(), command = %command, "Running remote command");

        let result = tokio::time::timeout(timeout, exec(&handle, command)).await;
        ssh::disconnect(&handle).await;

        match result {
            Ok(output) => output,
            Err(_) => {
                warn!(
                    addr = %server.address(),
                    command = %command,
                    "Remote command did not signal completion in time"
                );
                Err(BridgeError::CommandTimeout(timeout))
            }
        }
    }
}

/// Open an exec channel and collect until the channel closes
async fn exec(handle: &ssh::SshHandle, command: &str) -> Result<CommandOutput> {
    let mut channel = handle
        .channel_open_session()
        .await
        .map_err(|e| BridgeError::Connection(format!("failed to open SSH channel: {}", e)))?;

    channel
        .exec(true, command)
        .await
        .map_err(|e| BridgeError::Connection(format!("failed to execute command: {}", e)))?;

    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut exit_status = None;

    // Exit status may arrive after EOF, so only Close ends the exchange
    loop {
        match channel.wait().await {
            Some(ChannelMsg::Data { data }) => stdout.extend_from_slice(&data),
            Some(ChannelMsg::ExtendedData { data, ext: 1 }) => stderr.extend_from_slice(&data),
            Some(ChannelMsg::ExitStatus { exit_status: code }) => {
                exit_status = Some(code as i32);
            }
            Some(ChannelMsg::Close) | None => break,
            Some(_) => {}
        }
    }

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
        exit_status,
        verified: false,
    })
}
