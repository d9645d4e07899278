//! Client side of the booking backend's REST API.

pub mod auth;
pub mod client;
pub mod endpoints;
pub mod envelope;
pub mod error;

pub use auth::{HttpRefresher, TokenCoordinator, TokenFingerprint, TokenRefresher};
pub use client::ApiClient;
pub use endpoints::Resource;
pub use error::ApiError;
