//! WebSocket test client for protocol testing
//!
//! Provides both low-level WsConnection and high-level TestClient.
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long a test waits for an expected message
const RECV_TIMEOUT: Duration = Duration::from_secs(3);

/// Low-level WebSocket connection
pub struct WsConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

#[allow(dead_code)]
impl WsConnection {
    /// Connect to WebSocket endpoint
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{}/ws", addr);
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("Failed to connect");
        let (sink, stream) = ws.split();
        Self { sink, stream }
    }

    /// Send raw text message
    pub async fn send_raw(&mut self, msg: &str) {
        self.sink
            .send(Message::Text(msg.to_string().into()))
            .await
            .unwrap();
    }

    /// Send JSON message
    pub async fn send_json<T: Serialize>(&mut self, msg: &T) {
        let json = serde_json::to_string(msg).unwrap();
        self.send_raw(&json).await;
    }

    /// Send a ping frame and wait for the matching pong
    pub async fn ping(&mut self, payload: &[u8]) -> Vec<u8> {
        self.sink
            .send(Message::Ping(payload.to_vec().into()))
            .await
            .unwrap();
        loop {
            match tokio::time::timeout(RECV_TIMEOUT, self.stream.next()).await {
                Ok(Some(Ok(Message::Pong(data)))) => return data.to_vec(),
                Ok(Some(Ok(_))) => continue,
                other => panic!("Expected pong, got {:?}", other),
            }
        }
    }

    /// Receive raw text message
    pub async fn recv_raw(&mut self) -> String {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => return text.to_string(),
                Some(Ok(Message::Ping(_))) => continue,
                Some(Ok(_)) => continue,
                Some(Err(e)) => panic!("WebSocket error: {}", e),
                None => panic!("WebSocket closed"),
            }
        }
    }

    /// Receive and deserialize JSON message
    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> T {
        let text = tokio::time::timeout(RECV_TIMEOUT, self.recv_raw())
            .await
            .expect("Timed out waiting for message");
        serde_json::from_str(&text).expect("Failed to parse JSON")
    }

    /// Receive with timeout, returns None if timeout
    pub async fn recv_timeout(&mut self, duration: Duration) -> Option<String> {
        tokio::time::timeout(duration, self.recv_raw()).await.ok()
    }

    /// Close the connection
    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
    }
}

/// High-level test client with helper methods
pub struct TestClient {
    pub conn: WsConnection,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect to server
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            conn: WsConnection::connect(addr).await,
        }
    }

    /// Request an attach without waiting for the outcome
    pub async fn send_attach(&mut self, server_id: Option<&str>, session: &str) {
        let mut msg = json!({
            "type": "attach",
            "session": session,
            "cols": 80,
            "rows": 24,
        });
        if let Some(id) = server_id {
            msg["serverId"] = json!(id);
        }
        self.conn.send_json(&msg).await;
    }

    /// Attach and assert the `attached` confirmation
    pub async fn attach(&mut self, server_id: Option<&str>, session: &str) -> Value {
        self.send_attach(server_id, session).await;
        let response = self.recv().await;
        assert_eq!(
            response["type"], "attached",
            "Expected attached but got: {}",
            response
        );
        assert_eq!(response["session"], session, "Session mismatch in attached");
        response
    }

    /// Send terminal input
    pub async fn input(&mut self, data: &str) {
        self.conn
            .send_json(&json!({ "type": "input", "data": data }))
            .await;
    }

    /// Resize terminal
    pub async fn resize(&mut self, cols: u16, rows: u16) {
        self.conn
            .send_json(&json!({ "type": "resize", "cols": cols, "rows": rows }))
            .await;
    }

    /// Receive next message
    pub async fn recv(&mut self) -> Value {
        self.conn.recv_json().await
    }

    /// Receive the next message, asserting it is an error
    pub async fn expect_error(&mut self) -> Value {
        let msg = self.recv().await;
        assert_eq!(msg["type"], "error", "Expected error but got: {}", msg);
        msg
    }

    /// Assert no message received within duration
    pub async fn expect_no_message(&mut self, duration: Duration) {
        let got = self.conn.recv_timeout(duration).await;
        assert!(got.is_none(), "Expected no message but received {:?}", got);
    }
}
