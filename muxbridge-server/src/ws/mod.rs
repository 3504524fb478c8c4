//! WebSocket terminal relay

mod connection;
mod protocol;

pub use connection::ws_handler;
pub use protocol::{ClientMessage, ServerMessage};
