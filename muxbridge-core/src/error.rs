//! Error types for muxbridge-core

use std::time::Duration;

use thiserror::Error;

/// Top-level error type for muxbridge-core
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Malformed registry or session input
    #[error("{0}")]
    Validation(String),

    /// Attempt to delete or redirect the local server
    #[error("{0}")]
    InvariantViolation(String),

    #[error("Server not found: {0}")]
    ServerNotFound(String),

    #[error("Tmux session \"{0}\" not found")]
    SessionNotFound(String),

    #[error("Window {index} not found in session \"{session}\"")]
    WindowNotFound { session: String, index: u32 },

    /// Authentication or network failure reaching a server
    #[error("Connection error: {0}")]
    Connection(String),

    /// Command did not complete and its post-condition could not be verified
    #[error("Command timed out after {0:?}")]
    CommandTimeout(Duration),

    #[error("Command failed with status {status}: {stderr}")]
    CommandFailed { status: i32, stderr: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Machine-readable code used in protocol error messages
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "VALIDATION_ERROR",
            BridgeError::InvariantViolation(_) => "INVARIANT_VIOLATION",
            BridgeError::ServerNotFound(_) => "SERVER_NOT_FOUND",
            BridgeError::SessionNotFound(_) => "SESSION_NOT_FOUND",
            BridgeError::WindowNotFound { .. } => "WINDOW_NOT_FOUND",
            BridgeError::Connection(_) => "CONNECTION_ERROR",
            BridgeError::CommandTimeout(_) => "COMMAND_TIMEOUT",
            BridgeError::CommandFailed { .. } => "COMMAND_FAILED",
            BridgeError::Transport(_) | BridgeError::Storage(_) | BridgeError::Io(_) => {
                "ATTACH_FAILED"
            }
        }
    }
}

pub type Result<T, E = BridgeError> = std::result::Result<T, E>;
