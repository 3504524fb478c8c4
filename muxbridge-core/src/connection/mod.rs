//! Per-client-connection transport bindings

mod events;
mod registry;
mod utf8;

pub use events::{ClientEvent, SESSION_ENDED};
pub use registry::{AttachOutcome, AttachTicket, ConnectionId, ConnectionRegistry, RelayState};
pub use utf8::Utf8Decoder;
