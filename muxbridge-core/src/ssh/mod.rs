//! SSH client plumbing shared by the remote executor and the remote transport
//!
//! Connects to a [`ServerDefinition`] and authenticates with its stored
//! password or private key.

use std::sync::Arc;
use std::time::Duration;

use russh::client;
use tracing::{debug, info, warn};

use crate::error::{BridgeError, Result};
use crate::servers::{AuthType, ServerDefinition};

#[cfg(test)]
pub(crate) mod fixture;

/// Authenticated SSH connection
pub type SshHandle = client::Handle<SshHandler>;

/// SSH client handler
pub struct SshHandler {
    address: String,
}

#[async_trait::async_trait]
impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &russh_keys::key::PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        // TODO: pin host keys per server once the registry stores fingerprints
        warn!(
            addr = %self.address,
            fingerprint = %server_public_key.fingerprint(),
            "Accepting SSH host key without verification"
        );
        Ok(true)
    }
}

/// Connect and authenticate, failing with [`BridgeError::Connection`]
///
/// The whole handshake (TCP, key exchange, auth) is bounded by `timeout`.
pub async fn connect(server: &ServerDefinition, timeout: Duration) -> Result<SshHandle> {
    if server.auth_type == AuthType::Local {
        return Err(BridgeError::Validation(format!(
            "Server {} is local and has no SSH endpoint",
            server.name
        )));
    }

    let host = server
        .host
        .as_deref()
        .ok_or_else(|| BridgeError::Validation("Host is required".to_string()))?;
    let username = server
        .username
        .as_deref()
        .ok_or_else(|| BridgeError::Validation("Username is required".to_string()))?;
    let address = format!("{}:{}", host, server.port);

    tokio::time::timeout(timeout, handshake(server, host, username, &address))
        .await
        .map_err(|_| {
            BridgeError::Connection(format!(
                "timed out connecting to {} after {:?}",
                address, timeout
            ))
        })?
}

async fn handshake(
    server: &ServerDefinition,
    host: &str,
    username: &str,
    address: &str,
) -> Result<SshHandle> {
    let config = Arc::new(client::Config {
        inactivity_timeout: None,
        keepalive_interval: Some(Duration::from_secs(30)),
        keepalive_max: 3,
        ..Default::default()
    });
    let handler = SshHandler {
        address: address.to_string(),
    };

    debug!(addr = %address, user = %username, "Opening SSH connection");
    let mut session = client::connect(config, (host, server.port), handler)
        .await
        .map_err(|e| BridgeError::Connection(format!("SSH connection to {} failed: {}", address, e)))?;

    let authenticated = match server.auth_type {
        AuthType::Password => {
            let password = server.password.as_deref().unwrap_or_default();
            session
                .authenticate_password(username, password)
                .await
                .map_err(|e| BridgeError::Connection(format!("password auth failed: {}", e)))?
        }
        AuthType::Key => {
            let key_data = server.private_key.as_deref().unwrap_or_default();
            let key_pair = russh_keys::decode_secret_key(key_data, server.passphrase.as_deref())
                .map_err(|e| {
                    BridgeError::Connection(format!("failed to decode private key: {}", e))
                })?;
            session
                .authenticate_publickey(username, Arc::new(key_pair))
                .await
                .map_err(|e| BridgeError::Connection(format!("public key auth failed: {}", e)))?
        }
        AuthType::Local => false,
    };

    if !authenticated {
        return Err(BridgeError::Connection(format!(
            "authentication rejected for {}@{}",
            username, address
        )));
    }

    info!(addr = %address, user = %username, "SSH authentication successful");
    Ok(session)
}

/// Best-effort polite disconnect
pub async fn disconnect(handle: &SshHandle) {
    let _ = handle
        .disconnect(russh::Disconnect::ByApplication, "", "English")
        .await;
}
