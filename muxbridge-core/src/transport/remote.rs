//! Remote attach through an interactive SSH shell

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use russh::{Channel, ChannelMsg, client};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::traits::{CloseReason, EVENT_BUFFER, OpenedTransport, TermSize, Transport, TransportEvent};
use super::TransportError;
use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;
use crate::ssh::{self, SshHandle};

enum ShellCommand {
    Write(Vec<u8>),
    Resize(TermSize),
}

/// PTY-backed shell on a remote host with `tmux attach-session` typed in
///
/// The SSH channel is owned by a pump task; this handle only queues writes
/// and resizes to it.
pub struct SshShellTransport {
    commands: mpsc::UnboundedSender<ShellCommand>,
    cancel: CancellationToken,
    closed: AtomicBool,
}

impl SshShellTransport {
    /// Connect, request a PTY shell sized to `size`, and type `attach_line`
    pub async fn open(
        server: &ServerDefinition,
        attach_line: &str,
        size: TermSize,
        connect_timeout: Duration,
    ) -> Result<OpenedTransport> {
        let handle = ssh::connect(server, connect_timeout).await?;

        let channel = match start_shell(&handle, attach_line, size).await {
            Ok(channel) => channel,
            Err(e) => {
                ssh::disconnect(&handle).await;
                return Err(e);
            }
        };
        info!(server = %server.name, addr = %server.address(), "Remote shell attached");

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        tokio::spawn(pump(handle, channel, command_rx, event_tx, cancel.clone()));

        Ok(OpenedTransport {
            transport: Box::new(Self {
                commands: command_tx,
                cancel,
                closed: AtomicBool::new(false),
            }),
            events: event_rx,
        })
    }
}

async fn start_shell(
    handle: &SshHandle,
    attach_line: &str,
    size: TermSize,
) -> Result<Channel<client::Msg>> {
    let channel = handle
        .channel_open_session()
        .await
        .map_err(|e| BridgeError::Connection(format!("failed to open channel: {}", e)))?;
    channel
        .request_pty(
            false,
            "xterm-256color",
            u32::from(size.cols),
            u32::from(size.rows),
            0,
            0,
            &[],
        )
        .await
        .map_err(|e| BridgeError::Connection(format!("PTY request failed: {}", e)))?;
    channel
        .request_shell(false)
        .await
        .map_err(|e| BridgeError::Connection(format!("shell request failed: {}", e)))?;

    let line = format!("{}\n", attach_line);
    channel
        .data(line.as_bytes())
        .await
        .map_err(|e| BridgeError::Connection(format!("failed to send attach command: {}", e)))?;
    Ok(channel)
}

enum Step {
    Stop,
    Command(Option<ShellCommand>),
    Message(Option<ChannelMsg>),
}

/// Owns the channel until it closes or the transport is closed
async fn pump(
    handle: SshHandle,
    mut channel: Channel<client::Msg>,
    mut commands: mpsc::UnboundedReceiver<ShellCommand>,
    events: mpsc::Sender<TransportEvent>,
    cancel: CancellationToken,
) {
    let mut exit_status = None;

    let reason = loop {
        let step = tokio::select! {
            _ = cancel.cancelled() => Step::Stop,
            command = commands.recv() => Step::Command(command),
            message = channel.wait() => Step::Message(message),
        };

        match step {
            Step::Stop | Step::Command(None) => break None,
            Step::Command(Some(ShellCommand::Write(bytes))) => {
                if let Err(e) = channel.data(&bytes[..]).await {
                    break Some(CloseReason::Failed(e.to_string()));
                }
            }
            Step::Command(Some(ShellCommand::Resize(size))) => {
                if let Err(e) = channel
                    .window_change(u32::from(size.cols), u32::from(size.rows), 0, 0)
                    .await
                {
                    debug!(error = %e, "Remote resize failed");
                }
            }
            Step::Message(Some(ChannelMsg::Data { data })) => {
                if events.send(TransportEvent::Data(data.to_vec())).await.is_err() {
                    break None;
                }
            }
            Step::Message(Some(ChannelMsg::ExtendedData { data, .. })) => {
                if events.send(TransportEvent::Data(data.to_vec())).await.is_err() {
                    break None;
                }
            }
            Step::Message(Some(ChannelMsg::ExitStatus { exit_status: status })) => {
                exit_status = Some(status);
            }
            Step::Message(Some(ChannelMsg::Close)) | Step::Message(None) => {
                break Some(match exit_status {
                    Some(status) => CloseReason::Exited(Some(status)),
                    None => CloseReason::Disconnected,
                });
            }
            Step::Message(Some(_)) => {}
        }
    };

    let _ = channel.close().await;
    ssh::disconnect(&handle).await;

    match reason {
        Some(reason) => {
            debug!(reason = %reason, "Remote shell finished");
            let _ = events.send(TransportEvent::Closed(reason)).await;
        }
        None => debug!("Remote shell closed by bridge"),
    }
}

#[async_trait]
impl Transport for SshShellTransport {
    async fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Ok(());
        }
        self.commands
            .send(ShellCommand::Write(data.to_vec()))
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn resize(&self, size: TermSize) -> Result<(), TransportError> {
        if self.is_closed() {
            return Ok(());
        }
        self.commands
            .send(ShellCommand::Resize(size))
            .map_err(|_| TransportError::ChannelClosed)
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.cancel.cancel();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for SshShellTransport {
    fn drop(&mut self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            warn!("Remote shell dropped without close");
            self.cancel.cancel();
        }
    }
}
