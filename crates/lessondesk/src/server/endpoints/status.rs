use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use crate::types::AppState;

/// GET /health
pub async fn get_health(State(s): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "uptime_secs": s.started_at.elapsed().as_secs(),
        })),
    )
        .into_response()
}

/// GET /cache/stats
pub async fn get_cache_stats(State(s): State<Arc<AppState>>) -> Response {
    (StatusCode::OK, Json(s.dashboard.cache().stats())).into_response()
}

/// POST /cache/invalidate
///
/// Drops every cached list so the next read goes to the backend.
pub async fn post_invalidate_cache(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /cache/invalidate");
    s.dashboard.cache().clear();
    (StatusCode::OK, Json(json!({ "message": "Cache cleared" }))).into_response()
}
