//! Shared test utilities for muxbridge-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use muxbridge_core::{MockExecutor, MockTransportOpener};
use muxbridge_server::{AppState, BridgeConfig, MuxBridgeServer, ServerConfig};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// A running server over in-memory tmux and transports
#[allow(dead_code)]
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub executor: Arc<MockExecutor>,
    pub opener: Arc<MockTransportOpener>,
    _data_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Id of the seeded local server
    pub async fn local_id(&self) -> String {
        self.state
            .servers
            .default_server()
            .await
            .expect("local server seeded")
            .id
    }
}

/// Creates a test server whose opener knows the given sessions
#[allow(dead_code)]
pub async fn create_test_server(sessions: &[&str]) -> TestServer {
    create_test_server_with_timeout(sessions, Duration::from_secs(2)).await
}

/// Creates a test server with a custom attach timeout
#[allow(dead_code)]
pub async fn create_test_server_with_timeout(
    sessions: &[&str],
    attach_timeout: Duration,
) -> TestServer {
    let data_dir = TempDir::new().unwrap();
    let mut config = BridgeConfig::new(data_dir.path());
    config.attach_timeout = attach_timeout;
    config.command_timeout = Duration::from_millis(200);

    let executor = Arc::new(MockExecutor::new());
    let opener = Arc::new(MockTransportOpener::with_sessions(sessions.iter().copied()));
    let state = Arc::new(
        AppState::for_testing(&config, executor.clone(), opener.clone())
            .await
            .unwrap(),
    );

    let server = MuxBridgeServer::with_state(ServerConfig::default(), Arc::clone(&state));
    let addr = spawn_server(server).await;

    TestServer {
        addr,
        state,
        executor,
        opener,
        _data_dir: data_dir,
    }
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: MuxBridgeServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    // Brief delay to ensure server is accepting connections
    tokio::time::sleep(Duration::from_millis(10)).await;

    addr
}
