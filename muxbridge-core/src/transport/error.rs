//! Transport error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to spawn attach process: {0}")]
    SpawnFailed(String),

    #[error("Failed to resize terminal: {0}")]
    ResizeFailed(String),

    #[error("Transport channel closed")]
    ChannelClosed,

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<TransportError> for crate::error::BridgeError {
    fn from(e: TransportError) -> Self {
        crate::error::BridgeError::Transport(e.to_string())
    }
}
