//! Station listing, nearest-point lookup, and admin-only creation.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use crate::auth::{authenticate, require_admin, IdentityProvider};
use crate::domain::{GeoPoint, Station};
use crate::respond::{auth_error_response, error_response, storage_error_response};
use crate::storage::{Storage, StorageError};

const DEFAULT_NEARBY_RADIUS_METERS: f64 = 5000.0;

pub struct StationRouterState<S> {
    pub storage: Arc<S>,
    pub identity: Arc<dyn IdentityProvider>,
    /// Base URL used to build the QR payload for each station.
    pub public_url: String,
}

impl<S> Clone for StationRouterState<S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            identity: self.identity.clone(),
            public_url: self.public_url.clone(),
        }
    }
}

pub fn station_router<S: Storage + 'static>(state: StationRouterState<S>) -> Router {
    Router::new()
        .route(
            "/api/stations",
            get(list_handler::<S>).post(create_handler::<S>),
        )
        .route("/api/stations/nearby", get(nearby_handler::<S>))
        .with_state(state)
}

/// QR payload for a station: the public review URL encoded on signage.
pub fn review_url(public_url: &str, external_id: &str) -> String {
    format!("{}/review/{}", public_url.trim_end_matches('/'), external_id)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    station_id: Option<String>,
}

async fn list_handler<S: Storage>(
    State(state): State<StationRouterState<S>>,
    Query(query): Query<ListQuery>,
) -> Response {
    let result = match query.station_id {
        Some(external_id) => state
            .storage
            .find_station(&external_id)
            .map(|station| station.into_iter().collect::<Vec<_>>()),
        None => state.storage.list_stations(),
    };
    match result {
        Ok(stations) => (StatusCode::OK, Json(stations)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: Option<f64>,
    lng: Option<f64>,
    radius: Option<f64>,
}

async fn nearby_handler<S: Storage>(
    State(state): State<StationRouterState<S>>,
    Query(query): Query<NearbyQuery>,
) -> Response {
    let (Some(latitude), Some(longitude)) = (query.lat, query.lng) else {
        return error_response(StatusCode::BAD_REQUEST, "validation", "missing lat/lng");
    };
    let center = GeoPoint {
        longitude,
        latitude,
    };
    if !center.in_range() {
        return error_response(StatusCode::BAD_REQUEST, "validation", "invalid lat/lng");
    }
    let radius = query.radius.unwrap_or(DEFAULT_NEARBY_RADIUS_METERS);

    match state.storage.nearby_stations(center, radius) {
        Ok(stations) => (StatusCode::OK, Json(stations)).into_response(),
        Err(err) => storage_error_response(err),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateStationRequest {
    name: String,
    station_id: String,
    lat: f64,
    lng: f64,
}

async fn create_handler<S: Storage>(
    State(state): State<StationRouterState<S>>,
    headers: HeaderMap,
    Json(request): Json<CreateStationRequest>,
) -> Response {
    let identity = match authenticate(state.identity.as_ref(), &headers) {
        Ok(identity) => identity,
        Err(err) => return auth_error_response(err),
    };
    if let Err(err) = require_admin(&*state.storage, &identity) {
        return auth_error_response(err);
    }

    let name = request.name.trim();
    let external_id = request.station_id.trim();
    if name.is_empty() || external_id.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "validation",
            "name and stationId are required",
        );
    }
    let location = GeoPoint {
        longitude: request.lng,
        latitude: request.lat,
    };
    if !location.in_range() {
        return error_response(StatusCode::BAD_REQUEST, "validation", "invalid lat/lng");
    }

    let mut station = Station::new(external_id, name, location);
    station.qr_code = Some(review_url(&state.public_url, external_id));

    match state.storage.insert_station(station) {
        Ok(station) => (StatusCode::OK, Json(station)).into_response(),
        Err(StorageError::Conflict) => {
            error_response(StatusCode::CONFLICT, "conflict", "station already exists")
        }
        Err(err) => storage_error_response(err),
    }
}
