use std::path::PathBuf;
use std::time::Duration;

use muxbridge_server::{BridgeConfig, ServerConfig};
use serde::{Deserialize, Serialize};

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawMuxBridgeConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,

    #[serde(default)]
    pub tmux: RawTmuxConfig,

    #[serde(default)]
    pub timeouts: RawTimeoutsConfig,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTmuxConfig {
    pub binary: Option<String>,
    pub socket: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTimeoutsConfig {
    pub command_secs: Option<u64>,
    pub attach_secs: Option<u64>,
    pub ssh_connect_secs: Option<u64>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MuxBridgeConfig {
    pub server: ListenConfig,
    pub storage: StorageConfig,
    pub tmux: TmuxConfig,
    pub timeouts: TimeoutsConfig,
}

impl Default for MuxBridgeConfig {
    fn default() -> Self {
        Self {
            server: ListenConfig::default(),
            storage: StorageConfig {
                data_dir: muxbridge_paths::data_dir(),
            },
            tmux: TmuxConfig::default(),
            timeouts: TimeoutsConfig::default(),
        }
    }
}

impl MuxBridgeConfig {
    /// Address the daemon binds to
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::new(self.server.host.clone(), self.server.port)
    }

    /// Settings for the core components behind the daemon
    pub fn bridge_config(&self) -> BridgeConfig {
        BridgeConfig {
            data_dir: self.storage.data_dir.clone(),
            tmux_binary: self.tmux.binary.clone(),
            tmux_socket: self.tmux.socket.clone(),
            command_timeout: Duration::from_secs(self.timeouts.command_secs),
            attach_timeout: Duration::from_secs(self.timeouts.attach_secs),
            ssh_connect_timeout: Duration::from_secs(self.timeouts.ssh_connect_secs),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenConfig {
    /// Interface the daemon binds to
    pub host: String,
    /// Port for HTTP and WebSocket traffic
    pub port: u16,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `servers.json`
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TmuxConfig {
    pub binary: String,

    /// `-S` socket used for local invocations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socket: Option<PathBuf>,
}

impl Default for TmuxConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_TMUX_BINARY.to_string(),
            socket: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutsConfig {
    pub command_secs: u64,
    pub attach_secs: u64,
    pub ssh_connect_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            command_secs: DEFAULT_COMMAND_SECS,
            attach_secs: DEFAULT_ATTACH_SECS,
            ssh_connect_secs: DEFAULT_SSH_CONNECT_SECS,
        }
    }
}

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_TMUX_BINARY: &str = "tmux";
pub const DEFAULT_COMMAND_SECS: u64 = 10;
pub const DEFAULT_ATTACH_SECS: u64 = 15;
pub const DEFAULT_SSH_CONNECT_SECS: u64 = 10;
