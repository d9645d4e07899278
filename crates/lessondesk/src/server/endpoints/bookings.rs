//! Booking table and booking actions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

use crate::server::types::ApiErrorType;
use crate::types::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignSlotBody {
    pub slot_id: String,
}

/// GET /bookings
///
/// Bookings with student, school, course and slot labels, plus the actions
/// each booking's status enables.
pub async fn get_bookings(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /bookings");

    match s.dashboard.booking_table().await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => {
            error!("Failed to build booking table: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /bookings/:booking_id/slot_candidates
///
/// Slots of schedule containers for the booking's course. `can_assign` is
/// false when there are none.
pub async fn get_slot_candidates(
    Path(booking_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("GET /bookings/{}/slot_candidates", booking_id);

    match s.dashboard.slot_candidates(&booking_id).await {
        Ok(candidates) => (StatusCode::OK, Json(candidates)).into_response(),
        Err(e) => {
            error!("Failed to find slot candidates: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// POST /bookings/:booking_id/assign_slot
pub async fn post_assign_slot(
    Path(booking_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<AssignSlotBody>,
) -> Response {
    info!("POST /bookings/{}/assign_slot ({})", booking_id, body.slot_id);

    match s.dashboard.assign_slot(&booking_id, &body.slot_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!("Failed to assign slot: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// POST /bookings/:booking_id/confirm
pub async fn post_confirm(
    Path(booking_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("POST /bookings/{}/confirm", booking_id);

    match s.dashboard.confirm_booking(&booking_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!("Failed to confirm booking: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// POST /bookings/:booking_id/cancel
pub async fn post_cancel(
    Path(booking_id): Path<String>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("POST /bookings/{}/cancel", booking_id);

    match s.dashboard.cancel_booking(&booking_id).await {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(e) => {
            error!("Failed to cancel booking: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}
