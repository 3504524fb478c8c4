//! muxbridge-core: Core library for the muxbridge tmux session bridge
//!
//! This crate provides the pieces between a browser terminal and tmux:
//!
//! - **Server registry** - [`ServerRegistry`] for the file-backed list of local/SSH servers
//! - **Command execution** - [`CommandExecutor`] for one-shot commands, with a verification fallback
//! - **Multiplexer** - [`Multiplexer`] for tmux session and window discovery/mutation
//! - **Transports** - [`Transport`] over a local PTY or a remote SSH shell
//! - **Connections** - [`ConnectionRegistry`] binding each client connection to one transport
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use muxbridge_core::{Multiplexer, ServerExecutor, ServerRegistry, TmuxCommands};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let servers = ServerRegistry::load(std::path::Path::new("/tmp/muxbridge")).await?;
//!     let mux = Multiplexer::new(
//!         Arc::new(ServerExecutor::new(Duration::from_secs(10))),
//!         TmuxCommands::new("tmux", None),
//!         Duration::from_secs(10),
//!     );
//!
//!     let local = servers.default_server().await?;
//!     for session in mux.list_sessions(&local).await? {
//!         println!("{} ({} windows)", session.name, session.windows);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │                 ConnectionRegistry                  │
//! │   connection id ──▶ Binding { transport, forwarder }│
//! │                          │                          │
//! │              ┌───────────┴───────────┐              │
//! │     LocalPtyTransport       SshShellTransport       │
//! │     (tmux attach in PTY)    (shell + tmux attach)   │
//! └────────────────────────────────────────────────────┘
//!          ▲ has-session                ▲ servers
//!     Multiplexer ── CommandExecutor   ServerRegistry
//! ```

pub mod connection;
pub mod error;
pub mod exec;
pub mod mux;
pub mod servers;
pub mod ssh;
pub mod transport;

// Re-export key types for convenience
pub use connection::{
    AttachOutcome, AttachTicket, ClientEvent, ConnectionId, ConnectionRegistry, RelayState,
};
pub use error::{BridgeError, Result};
pub use exec::{
    CommandExecutor, CommandOutput, LocalExecutor, MockExecutor, MockResponse, ServerExecutor,
    SshExecutor,
};
pub use mux::{Multiplexer, Session, TmuxCommands, Window};
pub use servers::{AuthType, NewServer, ServerDefinition, ServerPatch, ServerRegistry, ServerView};
pub use transport::{
    CloseReason, MockTransportHandle, MockTransportOpener, MuxTransportOpener, TermSize,
    Transport, TransportError, TransportOpener,
};
