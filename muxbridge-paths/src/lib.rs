//! XDG Base Directory paths for muxbridge.
//!
//! The CLI and the daemon both resolve their directories through here so a
//! `muxbridge servers list` against a running `muxbridge serve` agrees on
//! where the server registry lives.

use std::path::{Path, PathBuf};

const APP_DIR: &str = "muxbridge";

/// Get the muxbridge config directory.
///
/// Returns `$XDG_CONFIG_HOME/muxbridge` if set, otherwise `~/.config/muxbridge`.
///
/// # Examples
///
/// ```
/// use muxbridge_paths::config_dir;
///
/// let config = config_dir().join("config.toml");
/// ```
pub fn config_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".config",
    )
}

/// Get the muxbridge data directory.
///
/// Returns `$XDG_DATA_HOME/muxbridge` if set, otherwise `~/.local/share/muxbridge`.
/// The server registry (`servers.json`) is stored here.
pub fn data_dir() -> PathBuf {
    resolve(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
        dirs::home_dir(),
        ".local/share",
    )
}

fn resolve(xdg: Option<PathBuf>, home: Option<PathBuf>, fallback: &str) -> PathBuf {
    match (xdg, home) {
        (Some(base), _) if !base.as_os_str().is_empty() => base.join(APP_DIR),
        (_, Some(home)) => home.join(fallback).join(APP_DIR),
        _ => Path::new(fallback).join(APP_DIR),
    }
}
