//! WebSocket protocol message types

use muxbridge_core::ClientEvent;
use serde::{Deserialize, Serialize};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Bind this connection to a tmux session
    Attach {
        /// Default server when absent
        #[serde(rename = "serverId", default, skip_serializing_if = "Option::is_none")]
        server_id: Option<String>,
        session: String,
        #[serde(default)]
        cols: u16,
        #[serde(default)]
        rows: u16,
    },

    /// Keystrokes for the bound session
    Input { data: String },

    /// Terminal geometry change
    Resize { cols: u16, rows: u16 },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Attach succeeded
    Attached {
        #[serde(rename = "serverId")]
        server_id: String,
        session: String,
    },

    /// Terminal output
    Output { data: String },

    /// Attach failure, session end, or a rejected frame
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
}

impl From<ClientEvent> for ServerMessage {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::Attached { server_id, session } => {
                ServerMessage::Attached { server_id, session }
            }
            ClientEvent::Output(data) => ServerMessage::Output { data },
            ClientEvent::Error { message, code } => ServerMessage::Error {
                message,
                code: Some(code),
            },
        }
    }
}
