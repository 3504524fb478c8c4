//! Notifications delivered to a client connection

use crate::error::BridgeError;

/// Error code sent when a bound session ends on its own
pub const SESSION_ENDED: &str = "SESSION_ENDED";

/// Event for the client side of a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Attach completed; output for this session follows
    Attached { server_id: String, session: String },
    /// Terminal output, decoded as UTF-8
    Output(String),
    /// Attach failure or session end
    Error { message: String, code: String },
}

impl ClientEvent {
    pub fn from_error(error: &BridgeError) -> Self {
        ClientEvent::Error {
            message: error.to_string(),
            code: error.code().to_string(),
        }
    }

    pub fn session_ended() -> Self {
        ClientEvent::Error {
            message: "Terminal session ended".to_string(),
            code: SESSION_ENDED.to_string(),
        }
    }
}
