//! Server error types

use thiserror::Error;

/// Errors that can occur in the muxbridge server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to build application state
    #[error("startup failed: {0}")]
    Startup(#[from] muxbridge_core::BridgeError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
