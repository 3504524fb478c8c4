use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::types::{
    DEFAULT_ATTACH_SECS, DEFAULT_COMMAND_SECS, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_SSH_CONNECT_SECS, DEFAULT_TMUX_BINARY, ListenConfig, MuxBridgeConfig,
    RawMuxBridgeConfig, RawServerConfig, RawStorageConfig, RawTimeoutsConfig, RawTmuxConfig,
    StorageConfig, TimeoutsConfig, TmuxConfig,
};

/// Environment variable naming the local tmux socket
pub const TMUX_SOCKET_ENV: &str = "TMUX_SOCKET";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project + environment)
    pub fn load() -> Result<MuxBridgeConfig> {
        Self::load_from(
            Some(&Self::user_config_path()),
            &Self::project_config_path(),
            std::env::var(TMUX_SOCKET_ENV).ok(),
        )
    }

    /// Load from explicit paths; missing files are skipped
    pub fn load_from(
        user_path: Option<&Path>,
        project_path: &Path,
        tmux_socket: Option<String>,
    ) -> Result<MuxBridgeConfig> {
        let mut raw = RawMuxBridgeConfig::default();

        // Layer 1: User config
        if let Some(user_path) = user_path
            && user_path.exists()
        {
            raw = Self::merge_raw(raw, Self::read_raw(user_path)?);
        }

        // Layer 2: Project config
        if project_path.exists() {
            raw = Self::merge_raw(raw, Self::read_raw(project_path)?);
        }

        // Layer 3: Environment
        if let Some(socket) = tmux_socket.filter(|s| !s.is_empty()) {
            raw.tmux.socket = Some(PathBuf::from(socket));
        }

        Ok(Self::finalize(raw))
    }

    /// Get user config path (`$XDG_CONFIG_HOME/muxbridge/config.toml`)
    pub fn user_config_path() -> PathBuf {
        muxbridge_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with MUXBRIDGE_PROJECT_CONFIG_DIR env var
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("MUXBRIDGE_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".muxbridge/config.toml")
        }
    }

    fn read_raw(path: &Path) -> Result<RawMuxBridgeConfig> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawMuxBridgeConfig, overlay: RawMuxBridgeConfig) -> RawMuxBridgeConfig {
        RawMuxBridgeConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            storage: RawStorageConfig {
                data_dir: overlay.storage.data_dir.or(base.storage.data_dir),
            },
            tmux: RawTmuxConfig {
                binary: overlay.tmux.binary.or(base.tmux.binary),
                socket: overlay.tmux.socket.or(base.tmux.socket),
            },
            timeouts: RawTimeoutsConfig {
                command_secs: overlay.timeouts.command_secs.or(base.timeouts.command_secs),
                attach_secs: overlay.timeouts.attach_secs.or(base.timeouts.attach_secs),
                ssh_connect_secs: overlay
                    .timeouts
                    .ssh_connect_secs
                    .or(base.timeouts.ssh_connect_secs),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawMuxBridgeConfig) -> MuxBridgeConfig {
        MuxBridgeConfig {
            server: ListenConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            storage: StorageConfig {
                data_dir: raw
                    .storage
                    .data_dir
                    .unwrap_or_else(muxbridge_paths::data_dir),
            },
            tmux: TmuxConfig {
                binary: raw
                    .tmux
                    .binary
                    .unwrap_or_else(|| DEFAULT_TMUX_BINARY.to_string()),
                socket: raw.tmux.socket,
            },
            timeouts: TimeoutsConfig {
                command_secs: raw.timeouts.command_secs.unwrap_or(DEFAULT_COMMAND_SECS),
                attach_secs: raw.timeouts.attach_secs.unwrap_or(DEFAULT_ATTACH_SECS),
                ssh_connect_secs: raw
                    .timeouts
                    .ssh_connect_secs
                    .unwrap_or(DEFAULT_SSH_CONNECT_SECS),
            },
        }
    }
}
