use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::ApiError;

/// Where the client is sent when its session cannot be renewed.
pub const LOGIN_ROUTE: &str = "/login";

/// JSON error body. `error` is the text to show in a notification.
#[derive(Debug, Serialize)]
pub struct ApiErrorType {
    #[serde(skip)]
    status: StatusCode,
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<&'static str>,
}

impl From<ApiError> for ApiErrorType {
    fn from(err: ApiError) -> Self {
        let status = match &err {
            ApiError::SessionExpired { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Server { status, .. } if *status < 500 => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ApiError::Server { .. } | ApiError::Network { .. } | ApiError::UnexpectedResponse { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::InvalidId { .. } => StatusCode::BAD_REQUEST,
            ApiError::Assignment(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::UrlError { .. } | ApiError::Store { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        Self {
            status,
            error: err.user_message(),
            detail: Some(err.to_string()),
            redirect: err.needs_reauth().then_some(LOGIN_ROUTE),
        }
    }
}

impl IntoResponse for ApiErrorType {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_redirects_to_login() {
        let body = ApiErrorType::from(ApiError::SessionExpired {
            reason: "refresh rejected".into(),
        });
        assert_eq!(body.status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.redirect, Some(LOGIN_ROUTE));
    }

    #[test]
    fn test_backend_validation_errors_pass_through() {
        let body = ApiErrorType::from(ApiError::Server {
            status: 422,
            message: Some("End time must be after start time".into()),
        });
        assert_eq!(body.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body.error, "End time must be after start time");

        let body = ApiErrorType::from(ApiError::Server {
            status: 500,
            message: None,
        });
        assert_eq!(body.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_invalid_id_is_a_bad_request() {
        let body = ApiErrorType::from(ApiError::InvalidId { id: "..".into() });
        assert_eq!(body.status, StatusCode::BAD_REQUEST);
        assert_eq!(body.redirect, None);
    }
}
