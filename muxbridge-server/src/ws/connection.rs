//! WebSocket connection handling

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use muxbridge_core::{ClientEvent, ConnectionId, TermSize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::AppState;

use super::protocol::{ClientMessage, ServerMessage};

/// Pending outbound events per connection
const OUTBOUND_BUFFER: usize = 256;

const INVALID_MESSAGE: &str = "INVALID_MESSAGE";

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let (event_tx, mut event_rx) = mpsc::channel::<ClientEvent>(OUTBOUND_BUFFER);
    let (control_tx, mut control_rx) = mpsc::channel::<Message>(8);

    let id = state.connections.connect(event_tx.clone()).await;
    info!(connection = id, "WebSocket client connected");

    // Single writer for registry events and control frames
    let send_task = tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                Some(event) = event_rx.recv() => {
                    match serde_json::to_string(&ServerMessage::from(event)) {
                        Ok(json) => Message::Text(json.into()),
                        Err(e) => {
                            warn!("Failed to serialize server message: {}", e);
                            continue;
                        }
                    }
                }
                Some(frame) = control_rx.recv() => frame,
                else => break,
            };
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text_message(&text, id, &state, &event_tx).await;
            }
            Ok(Message::Close(_)) => {
                debug!(connection = id, "WebSocket client sent close frame");
                break;
            }
            Ok(Message::Ping(data)) => {
                if control_tx.send(Message::Pong(data)).await.is_err() {
                    break;
                }
            }
            Ok(_) => {
                // Ignore binary and pong messages
            }
            Err(e) => {
                debug!(connection = id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    state.connections.release(id).await;
    send_task.abort();
    info!(connection = id, "WebSocket client disconnected");
}

/// Handle a text message from the client
///
/// Attach runs in its own task so input keeps flowing (and is dropped)
/// while the transport opens.
async fn handle_text_message(
    text: &str,
    id: ConnectionId,
    state: &Arc<AppState>,
    events: &mpsc::Sender<ClientEvent>,
) {
    let client_msg: ClientMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            debug!(connection = id, "Rejecting malformed message: {}", e);
            let _ = events
                .send(ClientEvent::Error {
                    message: format!("Invalid message: {}", e),
                    code: INVALID_MESSAGE.to_string(),
                })
                .await;
            return;
        }
    };

    match client_msg {
        ClientMessage::Attach {
            server_id,
            session,
            cols,
            rows,
        } => {
            debug!(connection = id, server_id = ?server_id, session = %session, "Attach requested");
            let Some(ticket) = state.connections.begin_attach(id).await else {
                return;
            };
            let connections = Arc::clone(&state.connections);
            tokio::spawn(async move {
                connections
                    .complete_attach(
                        ticket,
                        server_id.as_deref(),
                        &session,
                        TermSize::new(cols, rows),
                    )
                    .await;
            });
        }

        ClientMessage::Input { data } => {
            state.connections.forward_input(id, data.as_bytes()).await;
        }

        ClientMessage::Resize { cols, rows } => {
            state.connections.forward_resize(id, cols, rows).await;
        }
    }
}
