//! Connection registry: owns every client connection's binding
//!
//! Each connection has at most one live transport. A new attach tears the
//! old one down completely (forwarder stopped, transport closed) before
//! the replacement is opened, so two sessions' output never interleave.
//! Every attach bumps the connection's generation; an open that completes
//! under a stale generation is closed and discarded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::ClientEvent;
use super::utf8::Utf8Decoder;
use crate::error::{BridgeError, Result};
use crate::servers::{ServerDefinition, ServerRegistry};
use crate::transport::{OpenedTransport, TermSize, Transport, TransportEvent, TransportOpener};

/// Opaque id of a client connection
pub type ConnectionId = u64;

/// Relay state of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayState {
    Unbound,
    Binding,
    Bound { server_id: String, session: String },
}

/// How an attach request ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    Bound,
    /// Open failed; the client was sent an error
    Failed,
    /// Superseded by a newer attach or by release; nothing was sent
    Cancelled,
}

struct Binding {
    generation: u64,
    server_id: String,
    session: String,
    transport: Box<dyn Transport>,
    forwarder: JoinHandle<()>,
}

impl Binding {
    /// Stop forwarding, then close; nothing from this transport reaches the
    /// client afterwards
    async fn teardown(self) {
        self.forwarder.abort();
        let _ = self.forwarder.await;
        self.transport.close().await;
        debug!(server_id = %self.server_id, session = %self.session, "Binding torn down");
    }
}

#[derive(Default)]
struct SlotState {
    binding: Option<Binding>,
    /// Generation of the attach currently opening, if any
    pending: Option<u64>,
    released: bool,
}

/// Claim on a connection's next binding, from [`ConnectionRegistry::begin_attach`]
pub struct AttachTicket {
    slot: Arc<Slot>,
    generation: u64,
}

struct Slot {
    id: ConnectionId,
    sink: mpsc::Sender<ClientEvent>,
    generation: AtomicU64,
    state: Mutex<SlotState>,
}

/// Registry of client connections and their transport bindings
pub struct ConnectionRegistry {
    servers: Arc<ServerRegistry>,
    opener: Arc<dyn TransportOpener>,
    attach_timeout: Duration,
    next_id: AtomicU64,
    slots: RwLock<HashMap<ConnectionId, Arc<Slot>>>,
}

impl ConnectionRegistry {
    pub fn new(
        servers: Arc<ServerRegistry>,
        opener: Arc<dyn TransportOpener>,
        attach_timeout: Duration,
    ) -> Self {
        Self {
            servers,
            opener,
            attach_timeout,
            next_id: AtomicU64::new(1),
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Register a client connection; events for it go to `sink`
    pub async fn connect(&self, sink: mpsc::Sender<ClientEvent>) -> ConnectionId {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let slot = Arc::new(Slot {
            id,
            sink,
            generation: AtomicU64::new(0),
            state: Mutex::new(SlotState::default()),
        });
        self.slots.write().await.insert(id, slot);
        debug!(connection = id, "Connection registered");
        id
    }

    async fn slot(&self, id: ConnectionId) -> Option<Arc<Slot>> {
        self.slots.read().await.get(&id).cloned()
    }

    /// Bind `id` to `session` on `server_id` (or the default server)
    ///
    /// Any existing binding is torn down first. On failure the client gets
    /// an error event and the connection stays unbound.
    pub async fn attach(
        &self,
        id: ConnectionId,
        server_id: Option<&str>,
        session: &str,
        size: TermSize,
    ) -> AttachOutcome {
        match self.begin_attach(id).await {
            Some(ticket) => self.complete_attach(ticket, server_id, session, size).await,
            None => AttachOutcome::Cancelled,
        }
    }

    /// First half of [`attach`](Self::attach): supersede any earlier attach
    /// and tear down the current binding
    ///
    /// Callers that run the open concurrently call this in request order so
    /// the last request wins. Returns `None` for unknown connections.
    pub async fn begin_attach(&self, id: ConnectionId) -> Option<AttachTicket> {
        let slot = self.slot(id).await?;
        let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let mut state = slot.state.lock().await;
        if state.released {
            return None;
        }
        if let Some(old) = state.binding.take() {
            info!(connection = id, from = %old.session, "Detaching for re-attach");
            old.teardown().await;
        }
        state.pending = Some(generation);
        drop(state);

        Some(AttachTicket { slot, generation })
    }

    /// Second half of [`attach`](Self::attach): open the transport and bind
    /// it, unless a newer attach or a release superseded the ticket
    pub async fn complete_attach(
        &self,
        ticket: AttachTicket,
        server_id: Option<&str>,
        session: &str,
        size: TermSize,
    ) -> AttachOutcome {
        let AttachTicket { slot, generation } = ticket;
        let id = slot.id;

        let result = self.open(server_id, session, size).await;

        let mut state = slot.state.lock().await;
        if state.released || slot.generation.load(Ordering::SeqCst) != generation {
            if let Ok((_, opened)) = result {
                debug!(connection = id, session = %session, "Discarding superseded transport");
                opened.transport.close().await;
            }
            return AttachOutcome::Cancelled;
        }
        state.pending = None;

        match result {
            Ok((server, opened)) => {
                let _ = slot
                    .sink
                    .send(ClientEvent::Attached {
                        server_id: server.id.clone(),
                        session: session.to_string(),
                    })
                    .await;

                let forwarder = tokio::spawn(forward(
                    Arc::downgrade(&slot),
                    generation,
                    opened.events,
                    slot.sink.clone(),
                ));
                state.binding = Some(Binding {
                    generation,
                    server_id: server.id.clone(),
                    session: session.to_string(),
                    transport: opened.transport,
                    forwarder,
                });
                info!(connection = id, server = %server.name, session = %session, "Attached");
                AttachOutcome::Bound
            }
            Err(e) => {
                warn!(connection = id, session = %session, error = %e, "Attach failed");
                let _ = slot.sink.send(ClientEvent::from_error(&e)).await;
                AttachOutcome::Failed
            }
        }
    }

    async fn open(
        &self,
        server_id: Option<&str>,
        session: &str,
        size: TermSize,
    ) -> Result<(ServerDefinition, OpenedTransport)> {
        let server = self.servers.resolve(server_id).await?;
        let opened = tokio::time::timeout(
            self.attach_timeout,
            self.opener.open(&server, session, size),
        )
        .await
        .map_err(|_| {
            BridgeError::Connection(format!(
                "Attaching to {} on {} timed out after {:?}",
                session, server.name, self.attach_timeout
            ))
        })??;
        Ok((server, opened))
    }

    /// Write client input to the bound transport; dropped when unbound
    pub async fn forward_input(&self, id: ConnectionId, data: &[u8]) {
        let Some(slot) = self.slot(id).await else {
            return;
        };
        let state = slot.state.lock().await;
        match &state.binding {
            Some(binding) => {
                if let Err(e) = binding.transport.write(data).await {
                    warn!(connection = id, error = %e, "Input write failed");
                }
            }
            None => debug!(connection = id, bytes = data.len(), "Dropping input while unbound"),
        }
    }

    /// Resize the bound transport; dropped when unbound
    pub async fn forward_resize(&self, id: ConnectionId, cols: u16, rows: u16) {
        let Some(slot) = self.slot(id).await else {
            return;
        };
        let state = slot.state.lock().await;
        if let Some(binding) = &state.binding
            && let Err(e) = binding.transport.resize(TermSize::new(cols, rows)).await
        {
            debug!(connection = id, error = %e, "Resize failed");
        }
    }

    /// Close the connection's transport and forget it; idempotent
    ///
    /// An attach still opening for this connection is discarded when it
    /// completes.
    pub async fn release(&self, id: ConnectionId) {
        let Some(slot) = self.slots.write().await.remove(&id) else {
            return;
        };
        slot.generation.fetch_add(1, Ordering::SeqCst);

        let mut state = slot.state.lock().await;
        state.released = true;
        state.pending = None;
        if let Some(binding) = state.binding.take() {
            binding.teardown().await;
        }
        info!(connection = id, "Connection released");
    }

    /// Release every connection, for shutdown
    pub async fn release_all(&self) {
        let ids: Vec<ConnectionId> = self.slots.read().await.keys().copied().collect();
        for id in ids {
            self.release(id).await;
        }
    }

    pub async fn state(&self, id: ConnectionId) -> RelayState {
        let Some(slot) = self.slot(id).await else {
            return RelayState::Unbound;
        };
        let state = slot.state.lock().await;
        match (&state.binding, state.pending) {
            (Some(binding), _) => RelayState::Bound {
                server_id: binding.server_id.clone(),
                session: binding.session.clone(),
            },
            (None, Some(_)) => RelayState::Binding,
            (None, None) => RelayState::Unbound,
        }
    }

    pub async fn active_connections(&self) -> usize {
        self.slots.read().await.len()
    }
}

/// Relay transport events to the client until the transport ends
///
/// Ends silently when aborted by a teardown. When the transport closes on
/// its own, the binding is removed and the client told the session ended.
async fn forward(
    slot: Weak<Slot>,
    generation: u64,
    mut events: mpsc::Receiver<TransportEvent>,
    sink: mpsc::Sender<ClientEvent>,
) {
    let mut decoder = Utf8Decoder::new();

    while let Some(event) = events.recv().await {
        match event {
            TransportEvent::Data(bytes) => {
                let text = decoder.decode(&bytes);
                if !text.is_empty() && sink.send(ClientEvent::Output(text)).await.is_err() {
                    return;
                }
            }
            TransportEvent::Closed(reason) => {
                debug!(reason = %reason, "Transport closed");
                break;
            }
        }
    }

    let tail = decoder.finish();
    if !tail.is_empty() {
        let _ = sink.send(ClientEvent::Output(tail)).await;
    }

    let Some(slot) = slot.upgrade() else {
        return;
    };
    let mut state = slot.state.lock().await;
    if state
        .binding
        .as_ref()
        .is_some_and(|binding| binding.generation == generation)
        && let Some(binding) = state.binding.take()
    {
        binding.transport.close().await;
        info!(connection = slot.id, session = %binding.session, "Session ended");
        let _ = sink.send(ClientEvent::session_ended()).await;
    }
}
