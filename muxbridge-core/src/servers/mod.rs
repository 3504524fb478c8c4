//! Server registry
//!
//! Durable list of the hosts sessions can live on: the local host itself
//! plus any number of SSH-reachable remotes.

mod store;
mod types;

pub use store::{SERVERS_FILE, ServerRegistry};
pub use types::{AuthType, NewServer, ServerDefinition, ServerPatch, ServerView};
