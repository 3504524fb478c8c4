//! Live, resizable byte channels bound to an attached tmux session
//!
//! Callers depend on [`Transport`] and [`TransportOpener`] only; the choice
//! between a local PTY and a remote SSH shell is made inside
//! [`MuxTransportOpener`].

mod error;
mod local;
mod mock;
mod opener;
mod remote;
mod traits;

pub use error::TransportError;
pub use local::LocalPtyTransport;
pub use mock::{MockTransportHandle, MockTransportOpener};
pub use opener::MuxTransportOpener;
pub use remote::SshShellTransport;
pub use traits::{
    CloseReason, EVENT_BUFFER, OpenedTransport, TermSize, Transport, TransportEvent,
    TransportOpener,
};
