//! muxbridge-server - HTTP and WebSocket server for the muxbridge daemon
//!
//! This crate exposes the server registry and tmux sessions over a JSON
//! API, and relays attached terminals over a WebSocket at `/ws`.

mod error;
pub mod http;
mod state;
pub mod ws;

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

pub use error::ServerError;
pub use http::create_router;
pub use state::{AppState, BridgeConfig};

/// The main muxbridge server
pub struct MuxBridgeServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl MuxBridgeServer {
    /// Create a server backed by real tmux and SSH
    pub async fn new(config: ServerConfig, bridge: &BridgeConfig) -> Result<Self, ServerError> {
        let state = Arc::new(AppState::load(bridge).await?);
        Ok(Self { config, state })
    }

    /// Create a server with custom state (for testing)
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        Self { config, state }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        self.run_until(std::future::pending()).await
    }

    /// Run until `shutdown` resolves, then release every connection
    pub async fn run_until(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("muxbridge server listening on {}", addr);
        self.serve(listener, shutdown).await
    }

    /// Run on an already-bound listener (tests bind port 0)
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        self.serve(listener, std::future::pending()).await
    }

    /// Run on an already-bound listener until `shutdown` resolves
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = create_router(Arc::clone(&self.state));
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        tracing::info!("Releasing open terminal connections");
        self.state.connections.release_all().await;
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "0.0.0.0:3000")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
