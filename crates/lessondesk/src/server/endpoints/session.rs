use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::ApiError;
use crate::models::LoginRequest;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// POST /session/login
pub async fn post_login(
    State(s): State<Arc<AppState>>,
    Json(credentials): Json<LoginRequest>,
) -> Response {
    info!("POST /session/login");

    match s.dashboard.api().login(&credentials).await {
        Ok(user) => {
            s.dashboard.cache().clear();
            (StatusCode::OK, Json(json!({ "user": user }))).into_response()
        }
        Err(e) => {
            error!("Login failed: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// POST /session/logout
pub async fn post_logout(State(s): State<Arc<AppState>>) -> Response {
    info!("POST /session/logout");

    match s.dashboard.api().logout() {
        Ok(()) => {
            s.dashboard.cache().clear();
            (StatusCode::OK, Json(json!({ "message": "Logged out" }))).into_response()
        }
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}

/// GET /session/user
///
/// The user object cached at login.
pub async fn get_user(State(s): State<Arc<AppState>>) -> Response {
    let user = s
        .dashboard
        .api()
        .store()
        .cached_user()
        .map_err(ApiError::from);

    match user {
        Ok(Some(user)) => (StatusCode::OK, Json(user)).into_response(),
        Ok(None) => ApiErrorType::from(ApiError::SessionExpired {
            reason: "not logged in".to_string(),
        })
        .into_response(),
        Err(e) => ApiErrorType::from(e).into_response(),
    }
}
