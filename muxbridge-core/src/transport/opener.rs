//! Chooses the local or remote transport for a server

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::traits::{OpenedTransport, TermSize, TransportOpener};
use super::{LocalPtyTransport, SshShellTransport};
use crate::error::{BridgeError, Result};
use crate::mux::Multiplexer;
use crate::servers::ServerDefinition;

/// Production opener: local PTY for the local server, SSH shell otherwise
pub struct MuxTransportOpener {
    mux: Arc<Multiplexer>,
    ssh_connect_timeout: Duration,
}

impl MuxTransportOpener {
    pub fn new(mux: Arc<Multiplexer>, ssh_connect_timeout: Duration) -> Self {
        Self {
            mux,
            ssh_connect_timeout,
        }
    }
}

#[async_trait]
impl TransportOpener for MuxTransportOpener {
    async fn open(
        &self,
        server: &ServerDefinition,
        session: &str,
        size: TermSize,
    ) -> Result<OpenedTransport> {
        if !self.mux.has_session(server, session).await? {
            return Err(BridgeError::SessionNotFound(session.to_string()));
        }

        let commands = self.mux.commands();
        debug!(server = %server.name, session = %session, "Opening transport");

        if server.is_local() {
            let args = commands.attach_args(server, session);
            Ok(LocalPtyTransport::spawn(commands.binary(), &args, size)?)
        } else {
            let line = commands.attach_line(server, session);
            SshShellTransport::open(server, &line, size, self.ssh_connect_timeout).await
        }
    }
}
