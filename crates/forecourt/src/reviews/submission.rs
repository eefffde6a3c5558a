//! Typed review submission with enumerated per-field constraints, validated
//! before any of the counting or reward logic runs.

use serde::{Deserialize, Serialize};

use crate::domain::GeoPoint;

/// Raw request body for `POST /api/reviews`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewSubmission {
    /// External station identifier, as printed on the QR code.
    pub station_id: String,
    pub rating: u8,
    #[serde(default)]
    pub cleanliness: Option<u8>,
    #[serde(default)]
    pub service_speed: Option<u8>,
    #[serde(default)]
    pub staff_friendliness: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
    pub name: String,
    pub contact: String,
    #[serde(default)]
    pub gps: Option<GeoPoint>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// A submission that passed validation. Name and contact are trimmed so the
/// contact string can serve as the canonical identity key.
#[derive(Debug, Clone)]
pub struct ReviewDraft {
    pub station_id: String,
    pub rating: u8,
    pub cleanliness: Option<u8>,
    pub service_speed: Option<u8>,
    pub staff_friendliness: Option<u8>,
    pub comment: Option<String>,
    pub name: String,
    pub contact: String,
    pub gps: Option<GeoPoint>,
    pub device_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("stationId is required")]
    MissingStationId,
    #[error("rating must be between 1 and 5")]
    RatingOutOfRange,
    #[error("{field} must be between 0 and 5")]
    SubRatingOutOfRange { field: &'static str },
    #[error("name is required")]
    MissingName,
    #[error("contact is required")]
    MissingContact,
    #[error("gps coordinates are out of range")]
    InvalidCoordinates,
}

fn check_sub_rating(
    value: Option<u8>,
    field: &'static str,
) -> Result<Option<u8>, ValidationError> {
    match value {
        Some(v) if v > 5 => Err(ValidationError::SubRatingOutOfRange { field }),
        other => Ok(other),
    }
}

impl ReviewSubmission {
    pub fn validate(self) -> Result<ReviewDraft, ValidationError> {
        let station_id = self.station_id.trim().to_string();
        if station_id.is_empty() {
            return Err(ValidationError::MissingStationId);
        }
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::RatingOutOfRange);
        }
        let cleanliness = check_sub_rating(self.cleanliness, "cleanliness")?;
        let service_speed = check_sub_rating(self.service_speed, "serviceSpeed")?;
        let staff_friendliness = check_sub_rating(self.staff_friendliness, "staffFriendliness")?;

        let name = self.name.trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingName);
        }
        let contact = self.contact.trim().to_string();
        if contact.is_empty() {
            return Err(ValidationError::MissingContact);
        }
        if let Some(gps) = &self.gps {
            if !gps.in_range() {
                return Err(ValidationError::InvalidCoordinates);
            }
        }

        Ok(ReviewDraft {
            station_id,
            rating: self.rating,
            cleanliness,
            service_speed,
            staff_friendliness,
            comment: self.comment.filter(|c| !c.trim().is_empty()),
            name,
            contact,
            gps: self.gps,
            device_id: self.device_id.filter(|d| !d.trim().is_empty()),
        })
    }
}
