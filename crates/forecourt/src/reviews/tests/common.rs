use std::sync::Arc;

use axum::response::Response;
use chrono::{Duration, Utc};
use serde_json::Value;

use crate::auth::{DevIdentityProvider, Identity, JwtIdentityProvider};
use crate::domain::{GeoPoint, Review, ReviewId, Station, StationId, User, UserId};
use crate::reviews::rewards::RewardPolicy;
use crate::reviews::router::{review_router, ReviewRouterState};
use crate::reviews::service::ReviewService;
use crate::reviews::submission::ReviewSubmission;
use crate::storage::Storage;
use crate::testutil::MemoryStorage;

pub(super) const DEV_TOKEN: &str = "test-admin-token";

pub(super) fn policy() -> RewardPolicy {
    RewardPolicy {
        visit_threshold: 5,
        duplicate_window_hours: 24,
        coupon_ttl_days: None,
    }
}

pub(super) fn station() -> Station {
    Station::new(
        "ST-001",
        "North Forecourt",
        GeoPoint {
            longitude: 46.6753,
            latitude: 24.7136,
        },
    )
}

/// Service over a fresh in-memory store with one station pre-registered.
pub(super) fn build() -> (Arc<ReviewService<MemoryStorage>>, Arc<MemoryStorage>, Station) {
    let storage = Arc::new(MemoryStorage::default());
    let station = storage.insert_station(station()).expect("station inserts");
    let service = Arc::new(ReviewService::new(storage.clone(), policy()));
    (service, storage, station)
}

pub(super) fn anonymous() -> Identity {
    Identity {
        user: None,
        is_admin: false,
    }
}

pub(super) fn identity_for(user: &UserId) -> Identity {
    Identity {
        user: Some(user.clone()),
        is_admin: false,
    }
}

pub(super) fn submission(contact: &str) -> ReviewSubmission {
    ReviewSubmission {
        station_id: "ST-001".to_string(),
        rating: 4,
        cleanliness: Some(5),
        service_speed: None,
        staff_friendliness: None,
        comment: Some("quick stop".to_string()),
        name: "Dana".to_string(),
        contact: contact.to_string(),
        gps: None,
        device_id: None,
    }
}

pub(super) fn submission_with_device(contact: &str, device: &str) -> ReviewSubmission {
    ReviewSubmission {
        device_id: Some(device.to_string()),
        ..submission(contact)
    }
}

/// A historical review record inserted directly into the store, created
/// `hours_ago` in the past so window and counting behavior can be driven
/// without a clock abstraction.
pub(super) fn backdated_review(
    station: &StationId,
    contact: &str,
    hours_ago: i64,
    device_id: Option<&str>,
) -> Review {
    Review {
        id: ReviewId::generate(),
        station: station.clone(),
        rating: 4,
        cleanliness: None,
        service_speed: None,
        staff_friendliness: None,
        comment: None,
        name: "Dana".to_string(),
        contact: contact.to_string(),
        gps: None,
        device_id: device_id.map(str::to_string),
        user: None,
        source_addr: None,
        created_at: Utc::now() - Duration::hours(hours_ago),
        reward_given: false,
    }
}

pub(super) fn stored_user(storage: &MemoryStorage, phone: &str) -> User {
    storage
        .insert_user(User {
            id: UserId::generate(),
            password_hash: "hash".to_string(),
            email: None,
            phone: Some(phone.to_string()),
            is_admin: false,
            reviews: Vec::new(),
            device_id: None,
            created_at: Utc::now(),
        })
        .expect("user inserts")
}

pub(super) fn test_router(service: Arc<ReviewService<MemoryStorage>>) -> axum::Router {
    let jwt = Arc::new(JwtIdentityProvider::new("test-secret", 1));
    let identity = Arc::new(DevIdentityProvider::new(DEV_TOKEN.to_string(), jwt));
    review_router(ReviewRouterState { service, identity })
}

pub(super) fn test_jwt() -> Arc<JwtIdentityProvider> {
    Arc::new(JwtIdentityProvider::new("test-secret", 1))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
