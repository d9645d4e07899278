//! Error types for the backend API layer.

use thiserror::Error;

use crate::assignment::AssignmentError;
use crate::store::StoreError;

/// Shown when the server gave no usable message.
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// Errors that can occur while talking to the booking backend.
///
/// `Clone` so a single refresh outcome can be shared by every waiter.
#[derive(Debug, Error, Clone)]
pub enum ApiError {
    /// Network/HTTP request failed
    #[error("Network error: {message}")]
    Network { message: String },

    /// Backend answered with a non-success status
    #[error("Server returned {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Server { status: u16, message: Option<String> },

    /// Token refresh failed or the refreshed token was rejected; stored
    /// credentials have been cleared and the user must log in again
    #[error("Session expired: {reason}")]
    SessionExpired { reason: String },

    /// Backend response could not be decoded
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },

    /// URL parsing/construction failed
    #[error("URL error: {message}")]
    UrlError { message: String },

    /// An id that cannot name a single path segment
    #[error("Invalid id {id:?}")]
    InvalidId { id: String },

    /// Requested record is not in the backend's list
    #[error("{what} not found")]
    NotFound { what: String },

    #[error(transparent)]
    Assignment(#[from] AssignmentError),

    /// Credential store failure
    #[error("Credential store error: {message}")]
    Store { message: String },
}

impl ApiError {
    /// Returns true if the user has to log in again.
    pub fn needs_reauth(&self) -> bool {
        matches!(self, ApiError::SessionExpired { .. })
    }

    /// Returns true if this error is potentially transient and retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network { .. } => true,
            ApiError::Server { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Text for a transient notification: the server's own message when it
    /// sent one, otherwise a generic fallback.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Server {
                message: Some(message),
                ..
            } => message.clone(),
            ApiError::SessionExpired { .. } => "Your session has expired. Please log in again.".to_string(),
            ApiError::NotFound { .. } | ApiError::InvalidId { .. } | ApiError::Assignment(_) => {
                self.to_string()
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Network {
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for ApiError {
    fn from(err: url::ParseError) -> Self {
        ApiError::UrlError {
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store {
            message: err.to_string(),
        }
    }
}

/// Pulls a human-readable message out of an error body.
pub(crate) fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error", "detail"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}
