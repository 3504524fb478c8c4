//! Server definition types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{BridgeError, Result};

/// Default SSH port
pub const DEFAULT_SSH_PORT: u16 = 22;

/// How a server is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    /// This process's own host; commands run as subprocesses
    Local,
    /// SSH with password authentication
    Password,
    /// SSH with private key authentication
    Key,
}

impl AuthType {
    pub fn is_local(self) -> bool {
        matches!(self, AuthType::Local)
    }
}

/// A stored server, credentials included
///
/// Never serialize this to clients; use [`ServerView`] instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerDefinition {
    pub id: String,
    pub name: String,
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// PEM/OpenSSH encoded private key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<String>,
    /// Working directory for new sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_path: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

impl ServerDefinition {
    /// The seeded entry for this host
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            auth_type: AuthType::Local,
            host: None,
            port: DEFAULT_SSH_PORT,
            username: None,
            password: None,
            private_key: None,
            passphrase: None,
            default_path: None,
            is_default: true,
            created_at: Utc::now(),
        }
    }

    pub fn is_local(&self) -> bool {
        self.auth_type.is_local()
    }

    /// `user@host:port`, for logs
    pub fn address(&self) -> String {
        format!(
            "{}@{}:{}",
            self.username.as_deref().unwrap_or(""),
            self.host.as_deref().unwrap_or("localhost"),
            self.port
        )
    }

    /// Check required fields for the chosen auth mode
    pub fn validate(&self) -> Result<()> {
        if is_blank(Some(&self.name)) {
            return Err(BridgeError::Validation("Server name is required".to_string()));
        }
        if self.is_local() {
            return Ok(());
        }
        if is_blank(self.host.as_deref()) {
            return Err(BridgeError::Validation("Host is required".to_string()));
        }
        if is_blank(self.username.as_deref()) {
            return Err(BridgeError::Validation("Username is required".to_string()));
        }
        if self.port == 0 {
            return Err(BridgeError::Validation("Port must be non-zero".to_string()));
        }
        match self.auth_type {
            AuthType::Password if is_blank(self.password.as_deref()) => Err(
                BridgeError::Validation("Password is required for password auth".to_string()),
            ),
            AuthType::Key if is_blank(self.private_key.as_deref()) => Err(
                BridgeError::Validation("Private key is required for key auth".to_string()),
            ),
            _ => Ok(()),
        }
    }

    /// Redacted copy safe to return to clients
    pub fn view(&self) -> ServerView {
        let has_credential = match self.auth_type {
            AuthType::Local => false,
            AuthType::Password => !is_blank(self.password.as_deref()),
            AuthType::Key => !is_blank(self.private_key.as_deref()),
        };
        ServerView {
            id: self.id.clone(),
            name: self.name.clone(),
            auth_type: self.auth_type,
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            default_path: self.default_path.clone(),
            is_default: self.is_default,
            has_credential,
            created_at: self.created_at,
        }
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}

/// Server as returned to clients: no password, key or passphrase
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerView {
    pub id: String,
    pub name: String,
    pub auth_type: AuthType,
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub default_path: Option<String>,
    pub is_default: bool,
    pub has_credential: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a server
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewServer {
    #[serde(default)]
    pub name: String,
    pub auth_type: Option<AuthType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
    pub default_path: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

impl NewServer {
    /// Build a definition with a generated id
    pub(crate) fn into_definition(self) -> ServerDefinition {
        ServerDefinition {
            id: uuid::Uuid::new_v4().to_string(),
            name: self.name.trim().to_string(),
            auth_type: self.auth_type.unwrap_or(AuthType::Password),
            host: self.host.map(|h| h.trim().to_string()),
            port: self.port.unwrap_or(DEFAULT_SSH_PORT),
            username: self.username.map(|u| u.trim().to_string()),
            password: self.password,
            private_key: self.private_key,
            passphrase: self.passphrase,
            default_path: self.default_path.filter(|p| !p.trim().is_empty()),
            is_default: self.is_default,
            created_at: Utc::now(),
        }
    }
}

/// Partial update; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPatch {
    pub name: Option<String>,
    pub auth_type: Option<AuthType>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
    pub default_path: Option<String>,
}

impl ServerPatch {
    /// Apply to a remote definition. Empty credentials keep the stored ones,
    /// since clients never see them and resubmit forms without them.
    pub(crate) fn apply_remote(self, server: &mut ServerDefinition) {
        self.apply_common(server);
        if let Some(auth_type) = self.auth_type {
            server.auth_type = auth_type;
        }
        if let Some(host) = self.host {
            server.host = Some(host.trim().to_string());
        }
        if let Some(port) = self.port {
            server.port = port;
        }
        if let Some(username) = self.username {
            server.username = Some(username.trim().to_string());
        }
        if let Some(password) = self.password.filter(|p| !p.is_empty()) {
            server.password = Some(password);
        }
        if let Some(key) = self.private_key.filter(|k| !k.trim().is_empty()) {
            server.private_key = Some(key);
        }
        if let Some(passphrase) = self.passphrase.filter(|p| !p.is_empty()) {
            server.passphrase = Some(passphrase);
        }
    }

    /// Apply to the local definition: only name and default path are mutable
    pub(crate) fn apply_local(self, server: &mut ServerDefinition) {
        self.apply_common(server);
    }

    fn apply_common(&self, server: &mut ServerDefinition) {
        if let Some(name) = &self.name {
            server.name = name.trim().to_string();
        }
        if let Some(path) = &self.default_path {
            server.default_path = if path.trim().is_empty() {
                None
            } else {
                Some(path.clone())
            };
        }
    }
}
