//! tmux session and window API handlers

use std::sync::Arc;

use axum::{Json, body::Bytes, extract::State};
use muxbridge_core::{BridgeError, Session, Window};
use serde::{Deserialize, Serialize};

use super::api::SuccessResponse;
use super::error::{ApiError, ApiResult};
use super::extract::ApiPath;
use crate::AppState;

/// Request body for POST /api/servers/:id/sessions
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    /// Generated when absent
    pub session_name: Option<String>,
    /// Program or composite shell line to run in the session
    pub command: Option<String>,
}

/// Response for POST /api/servers/:id/sessions
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub success: bool,
    pub session: String,
}

/// GET /api/sessions - Sessions of every server; unreachable ones are omitted
pub async fn list_all_sessions(State(state): State<Arc<AppState>>) -> Json<Vec<Session>> {
    let servers = state.servers.all().await;
    Json(state.mux.list_all(&servers).await)
}

/// GET /api/servers/:id/sessions
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
) -> ApiResult<Vec<Session>> {
    let server = state.servers.get(&id).await?;
    Ok(Json(state.mux.list_sessions(&server).await?))
}

impl CreateSessionRequest {
    /// Parse a create body; an empty body asks for all defaults
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|e| {
            ApiError(BridgeError::Validation(format!(
                "Invalid request body: {}",
                e
            )))
        })
    }
}

/// POST /api/servers/:id/sessions
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<String>,
    body: Bytes,
) -> ApiResult<CreateSessionResponse> {
    let body = CreateSessionRequest::from_body(&body)?;
    let server = state.servers.get(&id).await?;
    let session = state
        .mux
        .create_session(&server, body.session_name.as_deref(), body.command.as_deref())
        .await?;
    Ok(Json(CreateSessionResponse {
        success: true,
        session,
    }))
}

/// DELETE /api/servers/:id/sessions/:name
pub async fn kill_session(
    State(state): State<Arc<AppState>>,
    ApiPath((id, name)): ApiPath<(String, String)>,
) -> ApiResult<SuccessResponse> {
    let server = state.servers.get(&id).await?;
    state.mux.kill_session(&server, &name).await?;
    Ok(SuccessResponse::ok())
}

/// GET /api/servers/:id/sessions/:name/windows
pub async fn list_windows(
    State(state): State<Arc<AppState>>,
    ApiPath((id, name)): ApiPath<(String, String)>,
) -> ApiResult<Vec<Window>> {
    let server = state.servers.get(&id).await?;
    Ok(Json(state.mux.list_windows(&server, &name).await?))
}

/// DELETE /api/servers/:id/sessions/:name/windows/:index
pub async fn kill_window(
    State(state): State<Arc<AppState>>,
    ApiPath((id, name, index)): ApiPath<(String, String, u32)>,
) -> ApiResult<SuccessResponse> {
    let server = state.servers.get(&id).await?;
    state.mux.kill_window(&server, &name, index).await?;
    Ok(SuccessResponse::ok())
}
