//! Transport trait and shared types

use std::fmt;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::TransportError;
use crate::error::Result;
use crate::servers::ServerDefinition;

/// Capacity of a transport's event channel
pub const EVENT_BUFFER: usize = 256;

const DEFAULT_COLS: u16 = 80;
const DEFAULT_ROWS: u16 = 24;

/// Terminal geometry in character cells
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TermSize {
    pub cols: u16,
    pub rows: u16,
}

impl TermSize {
    /// Zero dimensions fall back to 80x24
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: if cols == 0 { DEFAULT_COLS } else { cols },
            rows: if rows == 0 { DEFAULT_ROWS } else { rows },
        }
    }
}

impl Default for TermSize {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

/// Why a transport stopped producing data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Attach process exited (local) or the remote shell reported a status
    Exited(Option<u32>),
    /// Remote channel or connection closed without a status
    Disconnected,
    /// Read side failed
    Failed(String),
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloseReason::Exited(Some(code)) => write!(f, "exited with status {}", code),
            CloseReason::Exited(None) => write!(f, "exited"),
            CloseReason::Disconnected => write!(f, "disconnected"),
            CloseReason::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Output of a transport, in production order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Data(Vec<u8>),
    /// Always the last event
    Closed(CloseReason),
}

/// Bidirectional terminal byte channel
///
/// Writes after [`Transport::close`] are no-ops. `close` is idempotent.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn write(&self, data: &[u8]) -> Result<(), TransportError>;

    /// Best effort; a closed transport ignores it
    async fn resize(&self, size: TermSize) -> Result<(), TransportError>;

    async fn close(&self);

    fn is_closed(&self) -> bool;
}

/// A freshly opened transport and its event stream
pub struct OpenedTransport {
    pub transport: Box<dyn Transport>,
    pub events: mpsc::Receiver<TransportEvent>,
}

impl fmt::Debug for OpenedTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenedTransport")
            .field("closed", &self.transport.is_closed())
            .finish()
    }
}

/// Opens transports to tmux sessions
#[async_trait]
pub trait TransportOpener: Send + Sync {
    /// Attach to `session` on `server`
    ///
    /// Fails with [`crate::BridgeError::SessionNotFound`] without spawning
    /// anything if the session does not exist.
    async fn open(
        &self,
        server: &ServerDefinition,
        session: &str,
        size: TermSize,
    ) -> Result<OpenedTransport>;
}
