//! In-memory transports for tests

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{
    CloseReason, EVENT_BUFFER, OpenedTransport, TermSize, Transport, TransportEvent,
    TransportOpener,
};
use super::TransportError;
use crate::error::{BridgeError, Result};
use crate::servers::ServerDefinition;

struct MockShared {
    server_id: String,
    session: String,
    size: TermSize,
    events: mpsc::Sender<TransportEvent>,
    written: Mutex<Vec<u8>>,
    resizes: Mutex<Vec<TermSize>>,
    closed: AtomicBool,
}

/// Test-side view of a transport opened by [`MockTransportOpener`]
#[derive(Clone)]
pub struct MockTransportHandle {
    shared: Arc<MockShared>,
}

impl MockTransportHandle {
    pub fn server_id(&self) -> &str {
        &self.shared.server_id
    }

    pub fn session(&self) -> &str {
        &self.shared.session
    }

    /// Size requested at open
    pub fn size(&self) -> TermSize {
        self.shared.size
    }

    /// Produce output as if the session printed it; ignored once closed
    pub async fn emit(&self, data: &[u8]) {
        if !self.is_closed() {
            let _ = self.shared.events.send(TransportEvent::Data(data.to_vec())).await;
        }
    }

    /// End the session from the far side
    pub async fn end(&self, reason: CloseReason) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            let _ = self.shared.events.send(TransportEvent::Closed(reason)).await;
        }
    }

    /// Everything written so far
    pub fn written(&self) -> Vec<u8> {
        self.shared
            .written
            .lock()
            .map(|w| w.clone())
            .unwrap_or_default()
    }

    pub fn resizes(&self) -> Vec<TermSize> {
        self.shared
            .resizes
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

struct MockTransport {
    shared: Arc<MockShared>,
    echo: bool,
}

#[async_trait]
impl Transport for MockTransport {
    async fn write(&self, data: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Ok(());
        }
        if let Ok(mut written) = self.shared.written.lock() {
            written.extend_from_slice(data);
        }
        if self.echo {
            let _ = self.shared.events.send(TransportEvent::Data(data.to_vec())).await;
        }
        Ok(())
    }

    async fn resize(&self, size: TermSize) -> Result<(), TransportError> {
        if !self.is_closed()
            && let Ok(mut resizes) = self.shared.resizes.lock()
        {
            resizes.push(size);
        }
        Ok(())
    }

    async fn close(&self) {
        if !self.shared.closed.swap(true, Ordering::SeqCst) {
            // Killed processes still report an exit; consumers must ignore it
            let _ = self
                .shared
                .events
                .try_send(TransportEvent::Closed(CloseReason::Exited(None)));
        }
    }

    fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct OpenerState {
    sessions: HashSet<String>,
    unreachable: HashSet<String>,
    delays: HashMap<String, Duration>,
    opened: Vec<MockTransportHandle>,
}

/// Opener over a fixed set of session names
///
/// Sessions exist on every reachable server. Opens are recorded so tests
/// can drive output and inspect input through [`MockTransportHandle`].
#[derive(Default)]
pub struct MockTransportOpener {
    state: Mutex<OpenerState>,
    echo: AtomicBool,
}

impl MockTransportOpener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions<I, S>(sessions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let opener = Self::new();
        for session in sessions {
            opener.add_session(session);
        }
        opener
    }

    pub fn add_session(&self, name: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.sessions.insert(name.into());
        }
    }

    /// Opens against `server_id` fail with a connection error
    pub fn set_unreachable(&self, server_id: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.unreachable.insert(server_id.to_string());
        }
    }

    /// Delay opens of `session` to simulate a slow handshake
    pub fn set_delay(&self, session: &str, delay: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.delays.insert(session.to_string(), delay);
        }
    }

    /// Echo writes back as output
    pub fn set_echo(&self, echo: bool) {
        self.echo.store(echo, Ordering::SeqCst);
    }

    /// Transports opened so far, in open order
    pub fn opened(&self) -> Vec<MockTransportHandle> {
        self.state
            .lock()
            .map(|state| state.opened.clone())
            .unwrap_or_default()
    }

    /// Most recent transport opened for `session`
    pub fn last_for(&self, session: &str) -> Option<MockTransportHandle> {
        self.opened()
            .into_iter()
            .rev()
            .find(|handle| handle.session() == session)
    }
}

#[async_trait]
impl TransportOpener for MockTransportOpener {
    async fn open(
        &self,
        server: &ServerDefinition,
        session: &str,
        size: TermSize,
    ) -> Result<OpenedTransport> {
        let (delay, exists, unreachable) = {
            let state = self
                .state
                .lock()
                .map_err(|_| BridgeError::Transport("mock state poisoned".to_string()))?;
            (
                state.delays.get(session).copied(),
                state.sessions.contains(session),
                state.unreachable.contains(&server.id),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if unreachable {
            return Err(BridgeError::Connection(format!("{} is unreachable", server.name)));
        }
        if !exists {
            return Err(BridgeError::SessionNotFound(session.to_string()));
        }

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let shared = Arc::new(MockShared {
            server_id: server.id.clone(),
            session: session.to_string(),
            size,
            events: tx,
            written: Mutex::new(Vec::new()),
            resizes: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        });

        if let Ok(mut state) = self.state.lock() {
            state.opened.push(MockTransportHandle {
                shared: Arc::clone(&shared),
            });
        }

        Ok(OpenedTransport {
            transport: Box::new(MockTransport {
                shared,
                echo: self.echo.load(Ordering::SeqCst),
            }),
            events: rx,
        })
    }
}
