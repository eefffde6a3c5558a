//! Storage port for the document store backing the platform.
//!
//! The trait mirrors the find/insert/update-by-filter operations the service
//! needs, so the HTTP layer and tests can run against an in-memory fake while
//! a deployment wires in a real database adapter.

use chrono::{DateTime, Utc};

use crate::domain::{Alert, Coupon, GeoPoint, Review, ReviewId, Station, StationId, User, UserId};

/// Partial identity signals used by the duplicate guard. Any single matching
/// signal counts as "the same visitor".
#[derive(Debug, Clone, Default)]
pub struct DuplicateSignals {
    pub user: Option<UserId>,
    pub device_id: Option<String>,
    pub source_addr: Option<String>,
}

impl DuplicateSignals {
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.device_id.is_none() && self.source_addr.is_none()
    }

    /// True when the review shares at least one signal with this submission.
    pub fn matches(&self, review: &Review) -> bool {
        if let (Some(user), Some(review_user)) = (&self.user, &review.user) {
            if user == review_user {
                return true;
            }
        }
        if let (Some(device), Some(review_device)) = (&self.device_id, &review.device_id) {
            if device == review_device {
                return true;
            }
        }
        if let (Some(addr), Some(review_addr)) = (&self.source_addr, &review.source_addr) {
            if addr == review_addr {
                return true;
            }
        }
        false
    }
}

/// Resolved identity for visit counting: the canonical contact string plus
/// every user id sharing that phone number. A review is attributable when
/// either key matches (union, not either-alone).
#[derive(Debug, Clone)]
pub struct IdentityFilter {
    pub contact: String,
    pub user_ids: Vec<UserId>,
}

impl IdentityFilter {
    pub fn matches(&self, review: &Review) -> bool {
        if review.contact == self.contact {
            return true;
        }
        review
            .user
            .as_ref()
            .is_some_and(|user| self.user_ids.contains(user))
    }
}

/// Lookup key for login, since accounts may register with email or phone.
#[derive(Debug, Clone)]
pub enum LoginKey {
    Email(String),
    Phone(String),
}

/// Error enumeration for storage failures.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// The document-store port. One implementation backs production; tests use
/// an in-memory fake with the same filter semantics.
pub trait Storage: Send + Sync {
    // Stations.
    fn insert_station(&self, station: Station) -> Result<Station, StorageError>;
    fn find_station(&self, external_id: &str) -> Result<Option<Station>, StorageError>;
    fn get_station(&self, id: &StationId) -> Result<Option<Station>, StorageError>;
    fn list_stations(&self) -> Result<Vec<Station>, StorageError>;
    /// Stations within `radius_meters` of the center, nearest first.
    fn nearby_stations(
        &self,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<Station>, StorageError>;
    fn station_count(&self) -> Result<u64, StorageError>;

    // Reviews.
    fn insert_review(&self, review: Review) -> Result<Review, StorageError>;
    fn find_review(&self, id: &ReviewId) -> Result<Option<Review>, StorageError>;
    /// Whether any review for the station created at or after `since`
    /// matches one of the signals.
    fn has_recent_review(
        &self,
        station: &StationId,
        since: DateTime<Utc>,
        signals: &DuplicateSignals,
    ) -> Result<bool, StorageError>;
    fn count_reviews(&self, filter: &IdentityFilter) -> Result<u64, StorageError>;
    fn latest_review_by_contact(&self, contact: &str) -> Result<Option<Review>, StorageError>;
    fn mark_review_rewarded(&self, id: &ReviewId) -> Result<(), StorageError>;

    // Users.
    fn insert_user(&self, user: User) -> Result<User, StorageError>;
    fn find_user(&self, id: &UserId) -> Result<Option<User>, StorageError>;
    fn find_user_by_login(&self, key: &LoginKey) -> Result<Option<User>, StorageError>;
    fn users_by_phone(&self, phone: &str) -> Result<Vec<User>, StorageError>;
    fn append_user_review(&self, user: &UserId, review: &ReviewId) -> Result<(), StorageError>;

    // Coupons.
    fn insert_coupon(&self, coupon: Coupon) -> Result<Coupon, StorageError>;
    fn find_coupon(&self, code: &str) -> Result<Option<Coupon>, StorageError>;
    /// Atomically flip `used` for an unused coupon, recording `used_at`.
    /// Returns `Conflict` when the coupon was already redeemed, so a second
    /// concurrent redemption cannot silently succeed.
    fn redeem_coupon(&self, code: &str, now: DateTime<Utc>) -> Result<Coupon, StorageError>;
    fn coupons_for_users(&self, users: &[UserId]) -> Result<Vec<Coupon>, StorageError>;

    // Alerts.
    fn insert_alert(&self, alert: Alert) -> Result<Alert, StorageError>;
    /// Newest first.
    fn list_alerts(&self) -> Result<Vec<Alert>, StorageError>;
}
