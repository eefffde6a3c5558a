//! HTTP endpoints for review submission and coupon redemption.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use super::service::{ReviewService, ReviewServiceError};
use super::submission::ReviewSubmission;
use crate::auth::{authenticate, IdentityProvider};
use crate::respond::{auth_error_response, error_response};
use crate::storage::Storage;

pub struct ReviewRouterState<S> {
    pub service: Arc<ReviewService<S>>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl<S> Clone for ReviewRouterState<S> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            identity: self.identity.clone(),
        }
    }
}

pub fn review_router<S: Storage + 'static>(state: ReviewRouterState<S>) -> Router {
    Router::new()
        .route("/api/reviews", post(submit_handler::<S>))
        .route("/api/rewards/profile", get(profile_handler::<S>))
        .route("/api/rewards/search", get(search_handler::<S>))
        .route("/api/rewards/scan", post(scan_handler::<S>))
        .route("/api/rewards/claim", post(claim_handler::<S>))
        .with_state(state)
}

/// Client address as reported by the reverse proxy. Absent headers mean no
/// source-address signal for the duplicate guard.
pub(crate) fn source_addr(headers: &HeaderMap) -> Option<String> {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        let first = forwarded.split(',').next().unwrap_or("").trim();
        if !first.is_empty() {
            return Some(first.to_string());
        }
    }
    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub(crate) fn service_error_response(err: ReviewServiceError) -> Response {
    match err {
        ReviewServiceError::Validation(_) => {
            error_response(StatusCode::BAD_REQUEST, "validation", err)
        }
        ReviewServiceError::StationNotFound | ReviewServiceError::CouponNotFound => {
            error_response(StatusCode::NOT_FOUND, "not_found", err)
        }
        ReviewServiceError::DuplicateWindow => {
            error_response(StatusCode::TOO_MANY_REQUESTS, "duplicate_window", err)
        }
        ReviewServiceError::CouponAlreadyRedeemed | ReviewServiceError::CouponExpired => {
            error_response(StatusCode::CONFLICT, "conflict", err)
        }
        ReviewServiceError::NotCouponOwner => {
            error_response(StatusCode::FORBIDDEN, "forbidden", err)
        }
        ReviewServiceError::Storage(_) => {
            tracing::error!(error = %err, "storage failure");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "server_error", err)
        }
    }
}

async fn submit_handler<S: Storage>(
    State(state): State<ReviewRouterState<S>>,
    headers: HeaderMap,
    Json(submission): Json<ReviewSubmission>,
) -> Response {
    let identity = match authenticate(state.identity.as_ref(), &headers) {
        Ok(identity) => identity,
        Err(err) => return auth_error_response(err),
    };
    let source = source_addr(&headers);

    match state.service.submit(&identity, source, submission) {
        Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
        Err(err) => service_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct CodeQuery {
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PhoneQuery {
    phone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CodeBody {
    code: Option<String>,
}

async fn profile_handler<S: Storage>(
    State(state): State<ReviewRouterState<S>>,
    Query(query): Query<CodeQuery>,
) -> Response {
    let Some(code) = query.code.filter(|c| !c.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "validation", "coupon code required");
    };
    match state.service.holder_profile(&code) {
        Ok(profile) => (StatusCode::OK, Json(profile)).into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn search_handler<S: Storage>(
    State(state): State<ReviewRouterState<S>>,
    Query(query): Query<PhoneQuery>,
) -> Response {
    let Some(phone) = query.phone.filter(|p| !p.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "validation", "phone required");
    };
    match state.service.search(&phone) {
        Ok(result) => (StatusCode::OK, Json(result)).into_response(),
        Err(err) => service_error_response(err),
    }
}

async fn scan_handler<S: Storage>(
    State(state): State<ReviewRouterState<S>>,
    Json(body): Json<CodeBody>,
) -> Response {
    let Some(code) = body.code.filter(|c| !c.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "validation", "coupon code required");
    };
    match state.service.scan(&code) {
        Ok(receipt) => {
            let body = json!({
                "code": receipt.coupon.code,
                "station": receipt.coupon.station,
                "stationName": receipt.station,
                "used": receipt.coupon.used,
                "usedAt": receipt.coupon.used_at,
                "user": receipt.coupon.user,
                "review": receipt.coupon.review,
                "message": "coupon claimed successfully",
            });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}

async fn claim_handler<S: Storage>(
    State(state): State<ReviewRouterState<S>>,
    headers: HeaderMap,
    Json(body): Json<CodeBody>,
) -> Response {
    let identity = match authenticate(state.identity.as_ref(), &headers) {
        Ok(identity) => identity,
        Err(err) => return auth_error_response(err),
    };
    let Some(code) = body.code.filter(|c| !c.is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "validation", "coupon code required");
    };
    match state.service.claim(&identity, &code) {
        Ok(receipt) => {
            let body = json!({ "message": "coupon claimed", "coupon": receipt.coupon });
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => service_error_response(err),
    }
}
