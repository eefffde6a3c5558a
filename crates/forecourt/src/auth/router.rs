//! Registration and login endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::{hash_password, verify_password, AuthError, JwtIdentityProvider};
use crate::domain::{User, UserId};
use crate::respond::{auth_error_response, error_response};
use crate::storage::{LoginKey, Storage, StorageError};

pub struct AuthRouterState<S> {
    pub storage: Arc<S>,
    pub tokens: Arc<JwtIdentityProvider>,
}

impl<S> Clone for AuthRouterState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            tokens: self.tokens.clone(),
        }
    }
}

pub fn auth_router<S: Storage + 'static>(state: AuthRouterState<S>) -> Router {
    Router::new()
        .route("/api/auth/register", post(register_handler::<S>))
        .route("/api/auth/login", post(login_handler::<S>))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
    #[serde(default)]
    pub device_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub password: String,
}

fn plausible_email(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.len() >= 5 && trimmed.contains('@') && trimmed.rsplit('@').next().is_some_and(|d| d.contains('.'))
}

fn plausible_phone(value: &str) -> bool {
    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    digits >= 7
}

fn validate_contact_pair(
    email: &Option<String>,
    phone: &Option<String>,
) -> Result<(), &'static str> {
    match (email, phone) {
        (None, None) => Err("email or phone is required"),
        (Some(email), _) if !plausible_email(email) => Err("email is not valid"),
        (_, Some(phone)) if !plausible_phone(phone) => Err("phone is not valid"),
        _ => Ok(()),
    }
}

async fn register_handler<S: Storage>(
    State(state): State<AuthRouterState<S>>,
    Json(request): Json<RegisterRequest>,
) -> Response {
    if request.password.len() < 6 {
        return error_response(
            StatusCode::BAD_REQUEST,
            "validation",
            "password must be at least 6 characters",
        );
    }
    if let Err(message) = validate_contact_pair(&request.email, &request.phone) {
        return error_response(StatusCode::BAD_REQUEST, "validation", message);
    }

    let existing = lookup_user(&*state.storage, &request.email, &request.phone);
    match existing {
        Ok(Some(_)) => {
            return error_response(StatusCode::CONFLICT, "conflict", "user already exists")
        }
        Ok(None) => {}
        Err(err) => return auth_error_response(err),
    }

    // bcrypt burns ~100ms of CPU; keep it off the async workers.
    let password = request.password;
    let password_hash = match tokio::task::spawn_blocking(move || hash_password(&password)).await {
        Ok(Ok(hash)) => hash,
        Ok(Err(err)) => return auth_error_response(err),
        Err(err) => {
            tracing::error!(error = %err, "password hashing task failed");
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "server_error",
                "internal error",
            );
        }
    };

    let user = User {
        id: UserId::generate(),
        password_hash,
        email: request.email.map(|e| e.trim().to_string()),
        phone: request.phone.map(|p| p.trim().to_string()),
        is_admin: false,
        reviews: Vec::new(),
        device_id: request.device_id,
        created_at: Utc::now(),
    };

    let user = match state.storage.insert_user(user) {
        Ok(user) => user,
        // A racing registration can win between the lookup and the insert.
        Err(StorageError::Conflict) => {
            return error_response(StatusCode::CONFLICT, "conflict", "user already exists")
        }
        Err(err) => return auth_error_response(AuthError::Storage(err)),
    };

    issue_token_response(&state.tokens, &user)
}

async fn login_handler<S: Storage>(
    State(state): State<AuthRouterState<S>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    if request.email.is_none() && request.phone.is_none() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "validation",
            "email or phone is required",
        );
    }

    let user = match lookup_user(&*state.storage, &request.email, &request.phone) {
        Ok(Some(user)) => user,
        Ok(None) => return auth_error_response(AuthError::InvalidCredentials),
        Err(err) => return auth_error_response(err),
    };

    let password = request.password;
    let password_hash = user.password_hash.clone();
    let verified =
        match tokio::task::spawn_blocking(move || verify_password(&password, &password_hash)).await
        {
            Ok(result) => result,
            Err(err) => {
                tracing::error!(error = %err, "password verification task failed");
                return error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "server_error",
                    "internal error",
                );
            }
        };
    match verified {
        Ok(true) => issue_token_response(&state.tokens, &user),
        Ok(false) => auth_error_response(AuthError::InvalidCredentials),
        Err(err) => auth_error_response(err),
    }
}

fn lookup_user<S: Storage>(
    storage: &S,
    email: &Option<String>,
    phone: &Option<String>,
) -> Result<Option<User>, AuthError> {
    if let Some(email) = email {
        if let Some(user) = storage.find_user_by_login(&LoginKey::Email(email.trim().to_string()))? {
            return Ok(Some(user));
        }
    }
    if let Some(phone) = phone {
        if let Some(user) = storage.find_user_by_login(&LoginKey::Phone(phone.trim().to_string()))? {
            return Ok(Some(user));
        }
    }
    Ok(None)
}

fn issue_token_response(tokens: &JwtIdentityProvider, user: &User) -> Response {
    match tokens.issue(&user.id) {
        Ok(token) => {
            let body = json!({
                "token": token,
                "user": {
                    "id": user.id,
                    "email": user.email,
                    "phone": user.phone,
                },
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => auth_error_response(err),
    }
}
