//! HTTP client for a running muxbridge daemon

use anyhow::{Context, Result, bail};
use muxbridge_core::{ServerView, Session};
use muxbridge_server::http::ErrorResponse;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// Default daemon address for inspection commands
pub const DEFAULT_URL: &str = "http://127.0.0.1:3000";

pub struct DaemonClient {
    client: Client,
    base_url: String,
}

impl DaemonClient {
    #[must_use]
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn list_servers(&self) -> Result<Vec<ServerView>> {
        self.get("/api/servers").await
    }

    /// Sessions on one server, or across every server when `server_id` is `None`
    pub async fn list_sessions(&self, server_id: Option<&str>) -> Result<Vec<Session>> {
        match server_id {
            Some(id) => self.get(&format!("/api/servers/{}/sessions", id)).await,
            None => self.get("/api/sessions").await,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to reach muxbridge daemon at {}", self.base_url))?;

        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorResponse>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            bail!("Request to {} failed: {}", path, message);
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = DaemonClient::new("http://localhost:3000/");
        assert_eq!(client.base_url, "http://localhost:3000");
    }

    #[tokio::test]
    async fn test_unreachable_daemon_reports_address() {
        let client = DaemonClient::new("http://127.0.0.1:1");
        let err = client.list_servers().await.unwrap_err();
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
