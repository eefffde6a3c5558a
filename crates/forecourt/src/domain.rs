//! Data model for the review platform: stations, reviews, users, coupons,
//! and broadcast alerts.
//!
//! Records are plain serde structs; identifiers are UUID-backed newtypes so
//! the storage port can be keyed without stringly-typed lookups. Wire field
//! names are camelCase to match the public API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

id_newtype!(StationId);
id_newtype!(ReviewId);
id_newtype!(UserId);
id_newtype!(CouponId);
id_newtype!(AlertId);

/// WGS84 coordinate, longitude first to match GeoJSON ordering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GeoPoint {
    pub fn in_range(&self) -> bool {
        (-180.0..=180.0).contains(&self.longitude) && (-90.0..=90.0).contains(&self.latitude)
    }
}

/// A fuel station that can be reviewed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Station {
    pub id: StationId,
    /// Stable external identifier printed on signage and QR codes.
    pub station_id: String,
    pub name: String,
    pub location: GeoPoint,
    /// Rendered QR payload pointing at the station's review URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
}

impl Station {
    pub fn new(station_id: impl Into<String>, name: impl Into<String>, location: GeoPoint) -> Self {
        Self {
            id: StationId::generate(),
            station_id: station_id.into(),
            name: name.into(),
            location,
            qr_code: None,
        }
    }
}

/// A single visit record. Immutable after creation except for `reward_given`,
/// which flips to true when the visit triggers a coupon.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub station: StationId,
    pub rating: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanliness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_speed: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staff_friendliness: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub name: String,
    pub contact: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gps: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_addr: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reward_given: bool,
}

/// A credential record. The hash never serializes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_admin: bool,
    pub reviews: Vec<ReviewId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Reasons a coupon cannot move to the redeemed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CouponStateError {
    #[error("coupon has already been redeemed")]
    AlreadyRedeemed,
    #[error("coupon has expired")]
    Expired,
}

/// A redeemable loyalty coupon. The code is globally unique and immutable;
/// `used` transitions from false to true exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: CouponId,
    pub code: String,
    pub user: Option<UserId>,
    pub review: ReviewId,
    pub station: StationId,
    pub used: bool,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_at: Option<DateTime<Utc>>,
}

impl Coupon {
    pub fn issue(
        user: Option<UserId>,
        review: ReviewId,
        station: StationId,
        issued_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: CouponId::generate(),
            code: Uuid::new_v4().to_string(),
            user,
            review,
            station,
            used: false,
            issued_at,
            expires_at,
            used_at: None,
        }
    }

    /// State-machine guard for the `issued -> redeemed` transition. An
    /// expired coupon is refused without touching the `used` flag.
    pub fn ensure_redeemable(&self, now: DateTime<Utc>) -> Result<(), CouponStateError> {
        if self.used {
            return Err(CouponStateError::AlreadyRedeemed);
        }
        if let Some(expires_at) = self.expires_at {
            if now > expires_at {
                return Err(CouponStateError::Expired);
            }
        }
        Ok(())
    }
}

/// Severity of a broadcast alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Info,
    Warning,
    Emergency,
}

impl Default for AlertKind {
    fn default() -> Self {
        Self::Info
    }
}

/// A fire-and-forget notification published by administrators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: AlertId,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}
