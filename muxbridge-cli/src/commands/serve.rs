//! Serve command for running the bridge daemon
//!
//! The daemon provides the HTTP API for server and session management
//! and the WebSocket relay that attaches browsers to tmux sessions.

use anyhow::Result;
use clap::Args;
use muxbridge_server::MuxBridgeServer;
use tracing::{info, warn};

use crate::config::{ConfigLoader, MuxBridgeConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the server in the foreground until Ctrl-C
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = apply_overrides(ConfigLoader::load()?, &args);
    let server_config = config.server_config();
    let bridge = config.bridge_config();

    info!(
        "Starting muxbridge on {} (data dir {})",
        server_config.addr(),
        bridge.data_dir.display()
    );
    if let Some(socket) = &bridge.tmux_socket {
        info!("Local tmux socket: {}", socket.display());
    }

    let server = MuxBridgeServer::new(server_config, &bridge).await?;
    server.run_until(shutdown_signal()).await?;

    info!("muxbridge stopped");
    Ok(())
}

fn apply_overrides(mut config: MuxBridgeConfig, args: &ServeArgs) -> MuxBridgeConfig {
    if let Some(host) = &args.host {
        config.server.host = host.clone();
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    config
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = ServeArgs {
            port: Some(8080),
            host: Some("127.0.0.1".to_string()),
        };
        let config = apply_overrides(MuxBridgeConfig::default(), &args);
        assert_eq!(config.server_config().addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_missing_flags_keep_config() {
        let mut config = MuxBridgeConfig::default();
        config.server.port = 4100;
        let args = ServeArgs {
            port: None,
            host: None,
        };
        let config = apply_overrides(config, &args);
        assert_eq!(config.server.port, 4100);
        assert_eq!(config.server.host, "0.0.0.0");
    }
}
