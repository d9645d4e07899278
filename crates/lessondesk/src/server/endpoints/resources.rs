//! Generic list and CRUD endpoints for every admin resource.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

use crate::api::Resource;
use crate::dashboard::MutationOutcome;
use crate::models::RoomAvailabilityRequest;
use crate::server::types::ApiErrorType;
use crate::types::AppState;

fn parse_resource(raw: &str) -> Result<Resource, Response> {
    raw.parse::<Resource>()
        .map_err(|e| ApiErrorType::from(e).into_response())
}

fn mutation_response(
    status: StatusCode,
    result: Result<MutationOutcome, crate::api::ApiError>,
) -> Response {
    match result {
        Ok(outcome) => (status, Json(outcome)).into_response(),
        Err(e) => {
            error!("Mutation failed: {}", e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /resources/:resource
pub async fn get_list(Path(resource): Path<String>, State(s): State<Arc<AppState>>) -> Response {
    info!("GET /resources/{}", resource);
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };

    match s.dashboard.list(resource).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(e) => {
            error!("Failed to list {}: {}", resource, e);
            ApiErrorType::from(e).into_response()
        }
    }
}

/// GET /lookups
///
/// Id-to-label maps for users, schools, courses, instructors and rooms.
pub async fn get_lookups(State(s): State<Arc<AppState>>) -> Response {
    info!("GET /lookups");
    (StatusCode::OK, Json(s.dashboard.lookups().await)).into_response()
}

/// POST /resources/:resource
pub async fn post_create(
    Path(resource): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Response {
    info!("POST /resources/{}", resource);
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mutation_response(StatusCode::CREATED, s.dashboard.create(resource, &body).await)
}

/// PUT /resources/:resource/:id
pub async fn put_update(
    Path((resource, id)): Path<(String, String)>,
    State(s): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Response {
    info!("PUT /resources/{}/{}", resource, id);
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mutation_response(StatusCode::OK, s.dashboard.update(resource, &id, &body).await)
}

/// DELETE /resources/:resource/:id
pub async fn delete_item(
    Path((resource, id)): Path<(String, String)>,
    State(s): State<Arc<AppState>>,
) -> Response {
    info!("DELETE /resources/{}/{}", resource, id);
    let resource = match parse_resource(&resource) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    mutation_response(StatusCode::OK, s.dashboard.delete(resource, &id).await)
}

/// POST /rooms/:room_id/availability
pub async fn post_room_availability(
    Path(room_id): Path<String>,
    State(s): State<Arc<AppState>>,
    Json(request): Json<RoomAvailabilityRequest>,
) -> Response {
    info!("POST /rooms/{}/availability", room_id);
    mutation_response(
        StatusCode::OK,
        s.dashboard.set_room_availability(&room_id, &request).await,
    )
}
