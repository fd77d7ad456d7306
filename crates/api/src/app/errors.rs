use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use tenantry_infra::StoreError;

use crate::app::session::SessionError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Map a directory failure; `what` names the missing thing for 404s.
pub fn store_error_to_response(err: StoreError, what: &'static str) -> axum::response::Response {
    match err {
        StoreError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", format!("{what} not found")),
        StoreError::Conflict(msg) => json_error(StatusCode::BAD_REQUEST, "conflict", msg),
        StoreError::Backend(msg) => {
            error!(error = %msg, "directory failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

/// Authentication failures never carry internal detail.
pub fn session_error_to_response(err: SessionError) -> axum::response::Response {
    match err {
        SessionError::Unauthorized => json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid credentials"),
        SessionError::InvalidExternalToken => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Invalid external token")
        }
        SessionError::FederationFailed => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "SSO authentication failed")
        }
        SessionError::Store(e) => {
            error!(error = %e, "session directory failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
        SessionError::Token(e) => {
            error!(error = %e, "session token could not be issued");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}
