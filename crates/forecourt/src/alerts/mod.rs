//! Administrator alert broadcast: persisted list plus a fire-and-forget
//! publisher port.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::{authenticate, require_admin, IdentityProvider};
use crate::domain::{Alert, AlertId, AlertKind};
use crate::respond::{auth_error_response, error_response, storage_error_response};
use crate::storage::Storage;

/// Outbound transport port for freshly created alerts. Delivery is best
/// effort; a failed broadcast never fails the request.
pub trait AlertBroadcaster: Send + Sync {
    fn broadcast(&self, alert: &Alert) -> Result<(), BroadcastError>;
}

#[derive(Debug, thiserror::Error)]
pub enum BroadcastError {
    #[error("alert transport unavailable: {0}")]
    Transport(String),
}

pub struct AlertRouterState<S, B> {
    pub storage: Arc<S>,
    pub broadcaster: Arc<B>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<S, B> Clone for AlertRouterState<S, B> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            broadcaster: self.broadcaster.clone(),
            identity: self.identity.clone(),
        }
    }
}

pub fn alert_router<S, B>(state: AlertRouterState<S, B>) -> Router
where
    S: Storage + 'static,
    B: AlertBroadcaster + 'static,
{
    Router::new()
        .route(
            "/api/alerts",
            get(list_handler::<S, B>).post(create_handler::<S, B>),
        )
        .with_state(state)
}

async fn list_handler<S: Storage, B: AlertBroadcaster>(
    State(state): State<AlertRouterState<S, B>>,
) -> Response {
    match state.storage.list_alerts() {
        Ok(alerts) => (StatusCode::OK, Json(alerts)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct CreateAlertRequest {
    message: Option<String>,
    #[serde(rename = "type", default)]
    kind: Option<AlertKind>,
}

async fn create_handler<S: Storage, B: AlertBroadcaster>(
    State(state): State<AlertRouterState<S, B>>,
    headers: HeaderMap,
    Json(request): Json<CreateAlertRequest>,
) -> Response {
    let identity = match authenticate(state.identity.as_ref(), &headers) {
        Ok(identity) => identity,
        Err(err) => return auth_error_response(err),
    };
    if let Err(err) = require_admin(&*state.storage, &identity) {
        return auth_error_response(err);
    }

    let Some(message) = request
        .message
        .map(|m| m.trim().to_string())
        .filter(|m| !m.is_empty())
    else {
        return error_response(StatusCode::BAD_REQUEST, "validation", "message is required");
    };

    let alert = Alert {
        id: AlertId::generate(),
        message,
        kind: request.kind.unwrap_or_default(),
        created_by: identity.user.clone(),
        created_at: Utc::now(),
    };

    match state.storage.insert_alert(alert) {
        Ok(alert) => {
            if let Err(err) = state.broadcaster.broadcast(&alert) {
                tracing::warn!(error = %err, "alert broadcast failed, alert still persisted");
            }
            (StatusCode::OK, Json(alert)).into_response()
        }
        Err(err) => storage_error_response(err),
    }
}
