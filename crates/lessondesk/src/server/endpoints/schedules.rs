use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::server::types::ApiErrorType;
use crate::types::AppState;

/// GET /schedules
///
/// Schedule containers joined with course, instructor and room labels, each
/// with its normalized slots.
pub async fn get_schedules(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /schedules");

    match s.dashboard.schedule_table().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!("Failed to build schedule table: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /slots
///
/// Every slot of every schedule container, in source order. An empty list is
/// a normal result.
pub async fn get_slots(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /slots");

    match s.dashboard.slots().await {
        Ok(slots) => (StatusCode::OK, Json(slots)).into_response(),
        Err(e) => {
            error!("Failed to normalize slots: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /reports/financial
pub async fn get_financial_report(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /reports/financial");

    match s.dashboard.financial_report().await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => {
            error!("Failed to fetch financial report: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}
