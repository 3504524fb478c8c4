//! Server registry API handlers

use std::sync::Arc;

use axum::{Json, extract::State};
use muxbridge_core::{NewServer, ServerPatch, ServerView};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::api::SuccessResponse;
use super::error::ApiResult;
use super::extract::{ApiJson, ApiPath};
use crate::AppState;

/// Result of a connectivity test
#[derive(Debug, Serialize, Deserialize)]
pub struct TestResponse {
    pub success: bool,
    pub message: String,
}

/// GET /api/servers - List servers without credentials
pub async fn list_servers(State(state): State<Arc<AppState>>) -> Json<Vec<ServerView>> {
    Json(state.servers.list().await)
}

/// POST /api/servers - Register a remote server
pub async fn create_server(
    State(state): State<Arc<AppState>>,
    ApiJson(body): ApiJson<NewServer>,
) -> ApiResult<ServerView> {
    let view = state.servers.create(body).await?;
    info!(id = %view.id, name = %view.name, "Server created");
    Ok(Json(view))
}

/// PUT /api/servers/:id - Update a server
pub async fn update_server(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    ApiJson(body): ApiJson<ServerPatch>,
) -> ApiResult<ServerView> {
    Ok(Json(state.servers.update(&id, body).await?))
}

/// DELETE /api/servers/:id - Remove a server
pub async fn delete_server(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<SuccessResponse> {
    state.servers.delete(&id).await?;
    info!(id = %id, "Server deleted");
    Ok(SuccessResponse::ok())
}

/// POST /api/servers/:id/default - Make a server the default
pub async fn set_default_server(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<ServerView> {
    Ok(Json(state.servers.set_default(&id).await?))
}

/// POST /api/servers/:id/test - Check connectivity and tmux availability
///
/// Connection failures are reported in the body, not as an error status.
pub async fn test_server(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<TestResponse> {
    let server = state.servers.get(&id).await?;

    let response = match state.mux.version(&server).await {
        Ok(Some(version)) => TestResponse {
            success: true,
            message: format!("Connected to {} ({})", server.name, version),
        },
        Ok(None) => TestResponse {
            success: true,
            message: format!("Connected to {}, but tmux was not found", server.name),
        },
        Err(e) => TestResponse {
            success: false,
            message: e.to_string(),
        },
    };
    Ok(Json(response))
}
