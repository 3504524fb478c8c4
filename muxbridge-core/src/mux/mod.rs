//! tmux session and window discovery/mutation
//!
//! Nothing here caches multiplexer state: every listing is a fresh query
//! through a [`crate::exec::CommandExecutor`].

mod command;
mod multiplexer;
mod parse;

pub use command::{TmuxCommands, is_composite, session_command, shell_quote, validate_session_name};
pub use multiplexer::Multiplexer;
pub use parse::{Session, Window, parse_sessions, parse_windows};
