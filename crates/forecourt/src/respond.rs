//! Shared error-body shape: every error response carries a stable
//! machine-readable `code` alongside the human message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::auth::AuthError;
use crate::storage::StorageError;

pub(crate) fn error_response(
    status: StatusCode,
    code: &'static str,
    message: impl std::fmt::Display,
) -> Response {
    let body = Json(json!({ "code": code, "error": message.to_string() }));
    (status, body).into_response()
}

pub(crate) fn storage_error_response(err: StorageError) -> Response {
    match err {
        StorageError::NotFound => error_response(StatusCode::NOT_FOUND, "not_found", err),
        StorageError::Conflict => error_response(StatusCode::CONFLICT, "conflict", err),
        StorageError::Unavailable(_) => {
            tracing::error!(error = %err, "storage failure");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", err)
        }
    }
}

pub(crate) fn auth_error_response(err: AuthError) -> Response {
    match err {
        AuthError::MissingToken | AuthError::InvalidToken => {
            error_response(StatusCode::UNAUTHORIZED, "unauthorized", err)
        }
        AuthError::InvalidCredentials => {
            error_response(StatusCode::UNAUTHORIZED, "unauthorized", err)
        }
        AuthError::Forbidden => error_response(StatusCode::FORBIDDEN, "forbidden", err),
        AuthError::TokenEncoding(_) | AuthError::Hash(_) | AuthError::Storage(_) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", err)
        }
    }
}
