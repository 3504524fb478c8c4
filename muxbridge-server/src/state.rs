//! Shared application state for the muxbridge server

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use muxbridge_core::{
    CommandExecutor, ConnectionRegistry, Multiplexer, MuxTransportOpener, ServerExecutor,
    ServerRegistry, TmuxCommands, TransportOpener,
};

use crate::ServerError;

/// Settings for building the core components
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Directory holding `servers.json`
    pub data_dir: PathBuf,
    pub tmux_binary: String,
    /// `-S` socket for local tmux invocations
    pub tmux_socket: Option<PathBuf>,
    pub command_timeout: Duration,
    pub attach_timeout: Duration,
    pub ssh_connect_timeout: Duration,
}

impl BridgeConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            tmux_binary: "tmux".to_string(),
            tmux_socket: None,
            command_timeout: Duration::from_secs(10),
            attach_timeout: Duration::from_secs(15),
            ssh_connect_timeout: Duration::from_secs(10),
        }
    }

    fn commands(&self) -> TmuxCommands {
        TmuxCommands::new(self.tmux_binary.clone(), self.tmux_socket.clone())
    }
}

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Registered servers
    pub servers: Arc<ServerRegistry>,
    /// tmux discovery and mutation
    pub mux: Arc<Multiplexer>,
    /// Live WebSocket bindings
    pub connections: Arc<ConnectionRegistry>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Build state backed by real tmux, subprocesses and SSH
    pub async fn load(config: &BridgeConfig) -> Result<Self, ServerError> {
        let executor: Arc<dyn CommandExecutor> =
            Arc::new(ServerExecutor::new(config.ssh_connect_timeout));
        let mux = Arc::new(Multiplexer::new(
            executor,
            config.commands(),
            config.command_timeout,
        ));
        let opener: Arc<dyn TransportOpener> = Arc::new(MuxTransportOpener::new(
            Arc::clone(&mux),
            config.ssh_connect_timeout,
        ));
        Self::with_components(config, mux, opener).await
    }

    /// Build state with injected executor-backed multiplexer and opener (for testing)
    pub async fn with_components(
        config: &BridgeConfig,
        mux: Arc<Multiplexer>,
        opener: Arc<dyn TransportOpener>,
    ) -> Result<Self, ServerError> {
        let servers = Arc::new(ServerRegistry::load(&config.data_dir).await?);
        let connections = Arc::new(ConnectionRegistry::new(
            Arc::clone(&servers),
            opener,
            config.attach_timeout,
        ));

        Ok(Self {
            servers,
            mux,
            connections,
            started_at: Utc::now(),
        })
    }

    /// Test state over an in-memory executor and opener
    pub async fn for_testing(
        config: &BridgeConfig,
        executor: Arc<dyn CommandExecutor>,
        opener: Arc<dyn TransportOpener>,
    ) -> Result<Self, ServerError> {
        let mux = Arc::new(Multiplexer::new(
            executor,
            config.commands(),
            config.command_timeout,
        ));
        Self::with_components(config, mux, opener).await
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use muxbridge_core::{MockExecutor, MockTransportOpener};
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_seeds_local_server() {
        let dir = TempDir::new().unwrap();
        let config = BridgeConfig::new(dir.path());
        let state = AppState::load(&config).await.unwrap();

        let servers = state.servers.list().await;
        assert_eq!(servers.len(), 1);
        assert!(servers[0].is_default);
        assert!(dir.path().join("servers.json").exists());
    }

    #[tokio::test]
    async fn uptime_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let state = AppState::for_testing(
            &BridgeConfig::new(dir.path()),
            Arc::new(MockExecutor::new()),
            Arc::new(MockTransportOpener::new()),
        )
        .await
        .unwrap();

        assert!(state.uptime_seconds() <= 1);
        assert_eq!(state.connections.active_connections().await, 0);
    }
}
