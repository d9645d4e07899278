use std::sync::Arc;

use axum::routing::{get, post, put};
use axum::Router;

use crate::server::endpoints::{bookings, resources, schedules, session, status};
use crate::types::AppState;

mod endpoints;
pub mod types;

/// Creates a router that can be used by `axum`.
///
/// # Parameters
/// - `app_state`: The app server state.
///
/// # Returns
/// The router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    let booking_router = Router::new()
        .route("/bookings", get(bookings::get_bookings))
        .route(
            "/bookings/:booking_id/slot_candidates",
            get(bookings::get_slot_candidates),
        )
        .route(
            "/bookings/:booking_id/assign_slot",
            post(bookings::post_assign_slot),
        )
        .route("/bookings/:booking_id/confirm", post(bookings::post_confirm))
        .route("/bookings/:booking_id/cancel", post(bookings::post_cancel));

    let resource_router = Router::new()
        .route(
            "/resources/:resource",
            get(resources::get_list).post(resources::post_create),
        )
        .route(
            "/resources/:resource/:id",
            put(resources::put_update).delete(resources::delete_item),
        )
        .route(
            "/rooms/:room_id/availability",
            post(resources::post_room_availability),
        )
        .route("/lookups", get(resources::get_lookups));

    let session_router = Router::new()
        .route("/session/login", post(session::post_login))
        .route("/session/logout", post(session::post_logout))
        .route("/session/user", get(session::get_user));

    Router::new()
        .route("/health", get(status::get_health))
        .route("/cache/stats", get(status::get_cache_stats))
        .route("/cache/invalidate", post(status::post_invalidate_cache))
        .route("/schedules", get(schedules::get_schedules))
        .route("/slots", get(schedules::get_slots))
        .route("/reports/financial", get(schedules::get_financial_report))
        .merge(booking_router)
        .merge(resource_router)
        .merge(session_router)
        .with_state(app_state)
}
