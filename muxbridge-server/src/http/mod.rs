//! HTTP server module

mod api;
mod error;
mod extract;
mod servers;
mod sessions;

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::ws::ws_handler;

pub use api::{HealthResponse, SuccessResponse};
pub use error::{ApiError, ErrorResponse};
pub use extract::{ApiJson, ApiPath};
pub use servers::TestResponse;
pub use sessions::{CreateSessionRequest, CreateSessionResponse};

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(api::health))
        .route(
            "/api/servers",
            get(servers::list_servers).post(servers::create_server),
        )
        .route(
            "/api/servers/:id",
            put(servers::update_server).delete(servers::delete_server),
        )
        .route("/api/servers/:id/default", post(servers::set_default_server))
        .route("/api/servers/:id/test", post(servers::test_server))
        .route(
            "/api/servers/:id/sessions",
            get(sessions::list_sessions).post(sessions::create_session),
        )
        .route(
            "/api/servers/:id/sessions/:name",
            delete(sessions::kill_session),
        )
        .route(
            "/api/servers/:id/sessions/:name/windows",
            get(sessions::list_windows),
        )
        .route(
            "/api/servers/:id/sessions/:name/windows/:index",
            delete(sessions::kill_window),
        )
        .route("/api/sessions", get(sessions::list_all_sessions))
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
