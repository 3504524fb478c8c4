//! File-backed server registry

use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::types::{AuthType, NewServer, ServerDefinition, ServerPatch, ServerView};
use crate::error::{BridgeError, Result};

/// Registry file name
pub const SERVERS_FILE: &str = "servers.json";

/// Name given to the seeded local entry
const LOCAL_SERVER_NAME: &str = "Local";

/// File-backed storage for server definitions
///
/// Every mutation holds the write lock until the file is persisted, so
/// writes to the store are serialized.
pub struct ServerRegistry {
    servers: RwLock<Vec<ServerDefinition>>,
    file_path: PathBuf,
}

impl ServerRegistry {
    /// Load servers from `data_dir`, seeding the local entry on first run
    pub async fn load(data_dir: &Path) -> Result<Self> {
        let file_path = data_dir.join(SERVERS_FILE);

        let mut servers: Vec<ServerDefinition> = if file_path.exists() {
            let content = fs::read_to_string(&file_path)
                .await
                .map_err(|e| BridgeError::Storage(format!("failed to read servers: {}", e)))?;
            serde_json::from_str(&content)
                .map_err(|e| BridgeError::Storage(format!("failed to parse servers: {}", e)))?
        } else {
            Vec::new()
        };

        let seeded = !servers.iter().any(ServerDefinition::is_local);
        if seeded {
            let mut local = ServerDefinition::local(LOCAL_SERVER_NAME);
            local.is_default = !servers.iter().any(|s| s.is_default);
            info!(id = %local.id, "Seeding local server entry");
            servers.insert(0, local);
        }

        let registry = Self {
            servers: RwLock::new(servers),
            file_path,
        };

        if seeded {
            let servers = registry.servers.write().await;
            registry.persist(&servers).await?;
        }

        Ok(registry)
    }

    /// All servers, credentials redacted
    pub async fn list(&self) -> Vec<ServerView> {
        let servers = self.servers.read().await;
        servers.iter().map(ServerDefinition::view).collect()
    }

    /// Full definition including credentials, for executors and transports
    pub async fn get(&self, id: &str) -> Result<ServerDefinition> {
        let servers = self.servers.read().await;
        servers
            .iter()
            .find(|s| s.id == id)
            .cloned()
            .ok_or_else(|| BridgeError::ServerNotFound(id.to_string()))
    }

    /// All full definitions, for aggregated discovery
    pub async fn all(&self) -> Vec<ServerDefinition> {
        self.servers.read().await.clone()
    }

    /// The default server, falling back to the local entry
    pub async fn default_server(&self) -> Result<ServerDefinition> {
        let servers = self.servers.read().await;
        servers
            .iter()
            .find(|s| s.is_default)
            .or_else(|| servers.iter().find(|s| s.is_local()))
            .cloned()
            .ok_or_else(|| BridgeError::ServerNotFound("default".to_string()))
    }

    /// Look up by id, or the default server when no id is given
    pub async fn resolve(&self, id: Option<&str>) -> Result<ServerDefinition> {
        match id.filter(|id| !id.is_empty()) {
            Some(id) => self.get(id).await,
            None => self.default_server().await,
        }
    }

    /// Add a remote server
    pub async fn create(&self, new: NewServer) -> Result<ServerView> {
        if new.auth_type == Some(AuthType::Local) {
            return Err(BridgeError::InvariantViolation(
                "The local server already exists and cannot be duplicated".to_string(),
            ));
        }

        let server = new.into_definition();
        server.validate()?;

        let mut servers = self.servers.write().await;
        if server.is_default {
            clear_default(&mut servers);
        }
        let view = server.view();
        info!(id = %server.id, name = %server.name, addr = %server.address(), "Adding server");
        servers.push(server);
        self.persist(&servers).await?;

        Ok(view)
    }

    /// Update a server. The local entry only accepts name and default path.
    pub async fn update(&self, id: &str, patch: ServerPatch) -> Result<ServerView> {
        let mut servers = self.servers.write().await;
        let server = servers
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| BridgeError::ServerNotFound(id.to_string()))?;

        let mut updated = server.clone();
        if updated.is_local() {
            if patch.auth_type.is_some_and(|t| !t.is_local()) {
                return Err(BridgeError::InvariantViolation(
                    "The local server cannot be redirected to a remote host".to_string(),
                ));
            }
            patch.apply_local(&mut updated);
        } else {
            if patch.auth_type == Some(AuthType::Local) {
                return Err(BridgeError::InvariantViolation(
                    "Only the seeded entry may use local auth".to_string(),
                ));
            }
            patch.apply_remote(&mut updated);
        }
        updated.validate()?;

        *server = updated;
        let view = server.view();
        debug!(id = %id, "Updated server");
        self.persist(&servers).await?;

        Ok(view)
    }

    /// Remove a server. The local entry cannot be deleted.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut servers = self.servers.write().await;
        let index = servers
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| BridgeError::ServerNotFound(id.to_string()))?;

        if servers[index].is_local() {
            return Err(BridgeError::InvariantViolation(
                "The local server cannot be deleted".to_string(),
            ));
        }

        let removed = servers.remove(index);
        if removed.is_default
            && let Some(local) = servers.iter_mut().find(|s| s.is_local())
        {
            local.is_default = true;
        }
        info!(id = %id, name = %removed.name, "Deleted server");
        self.persist(&servers).await
    }

    /// Make `id` the only default server
    pub async fn set_default(&self, id: &str) -> Result<ServerView> {
        let mut servers = self.servers.write().await;
        if !servers.iter().any(|s| s.id == id) {
            return Err(BridgeError::ServerNotFound(id.to_string()));
        }

        clear_default(&mut servers);
        let mut view = None;
        for server in servers.iter_mut().filter(|s| s.id == id) {
            server.is_default = true;
            view = Some(server.view());
        }
        self.persist(&servers).await?;

        view.ok_or_else(|| BridgeError::ServerNotFound(id.to_string()))
    }

    /// Write the full registry, credentials included. Written to a sibling
    /// temp file first so a crash never leaves a truncated registry.
    async fn persist(&self, servers: &[ServerDefinition]) -> Result<()> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                BridgeError::Storage(format!("failed to create data dir: {}", e))
            })?;
        }

        let content = serde_json::to_string_pretty(servers)
            .map_err(|e| BridgeError::Storage(format!("failed to serialize servers: {}", e)))?;

        let tmp_path = self.file_path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .map_err(|e| BridgeError::Storage(format!("failed to write servers: {}", e)))?;
        fs::rename(&tmp_path, &self.file_path)
            .await
            .map_err(|e| BridgeError::Storage(format!("failed to replace servers: {}", e)))?;

        Ok(())
    }
}

fn clear_default(servers: &mut [ServerDefinition]) {
    for server in servers.iter_mut() {
        server.is_default = false;
    }
}
