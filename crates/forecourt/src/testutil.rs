//! In-memory storage fakes shared by the unit tests. The map-backed fake
//! mirrors the filter semantics a document store would apply.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use crate::domain::{
    Alert, Coupon, GeoPoint, Review, ReviewId, Station, StationId, User, UserId,
};
use crate::storage::{DuplicateSignals, IdentityFilter, LoginKey, Storage, StorageError};

#[derive(Default, Clone)]
pub(crate) struct MemoryStorage {
    stations: Arc<Mutex<HashMap<StationId, Station>>>,
    reviews: Arc<Mutex<HashMap<ReviewId, Review>>>,
    users: Arc<Mutex<HashMap<UserId, User>>>,
    coupons: Arc<Mutex<HashMap<String, Coupon>>>,
    alerts: Arc<Mutex<Vec<Alert>>>,
    fail_coupon_inserts: Arc<std::sync::atomic::AtomicBool>,
    conflict_user_inserts: Arc<std::sync::atomic::AtomicBool>,
}

impl MemoryStorage {
    /// Make every subsequent coupon insert fail, to exercise the
    /// review-persisted-but-no-reward failure path.
    pub(crate) fn fail_coupon_inserts(&self) {
        self.fail_coupon_inserts
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make every subsequent user insert report a conflict, as when a
    /// racing registration wins between the lookup and the insert.
    pub(crate) fn conflict_user_inserts(&self) {
        self.conflict_user_inserts
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }
}

fn haversine_meters(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_M: f64 = 6_371_000.0;
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlng = (b.longitude - a.longitude).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().asin()
}

impl Storage for MemoryStorage {
    fn insert_station(&self, station: Station) -> Result<Station, StorageError> {
        let mut stations = self.stations.lock().expect("station mutex poisoned");
        if stations.values().any(|s| s.station_id == station.station_id) {
            return Err(StorageError::Conflict);
        }
        stations.insert(station.id.clone(), station.clone());
        Ok(station)
    }

    fn find_station(&self, external_id: &str) -> Result<Option<Station>, StorageError> {
        let stations = self.stations.lock().expect("station mutex poisoned");
        Ok(stations
            .values()
            .find(|s| s.station_id == external_id)
            .cloned())
    }

    fn get_station(&self, id: &StationId) -> Result<Option<Station>, StorageError> {
        let stations = self.stations.lock().expect("station mutex poisoned");
        Ok(stations.get(id).cloned())
    }

    fn list_stations(&self) -> Result<Vec<Station>, StorageError> {
        let stations = self.stations.lock().expect("station mutex poisoned");
        Ok(stations.values().cloned().collect())
    }

    fn nearby_stations(
        &self,
        center: GeoPoint,
        radius_meters: f64,
    ) -> Result<Vec<Station>, StorageError> {
        let stations = self.stations.lock().expect("station mutex poisoned");
        let mut close: Vec<(f64, Station)> = stations
            .values()
            .map(|s| (haversine_meters(center, s.location), s.clone()))
            .filter(|(distance, _)| *distance <= radius_meters)
            .collect();
        close.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(close.into_iter().map(|(_, s)| s).collect())
    }

    fn station_count(&self) -> Result<u64, StorageError> {
        let stations = self.stations.lock().expect("station mutex poisoned");
        Ok(stations.len() as u64)
    }

    fn insert_review(&self, review: Review) -> Result<Review, StorageError> {
        let mut reviews = self.reviews.lock().expect("review mutex poisoned");
        if reviews.contains_key(&review.id) {
            return Err(StorageError::Conflict);
        }
        reviews.insert(review.id.clone(), review.clone());
        Ok(review)
    }

    fn find_review(&self, id: &ReviewId) -> Result<Option<Review>, StorageError> {
        let reviews = self.reviews.lock().expect("review mutex poisoned");
        Ok(reviews.get(id).cloned())
    }

    fn has_recent_review(
        &self,
        station: &StationId,
        since: DateTime<Utc>,
        signals: &DuplicateSignals,
    ) -> Result<bool, StorageError> {
        let reviews = self.reviews.lock().expect("review mutex poisoned");
        Ok(reviews.values().any(|review| {
            review.station == *station && review.created_at >= since && signals.matches(review)
        }))
    }

    fn count_reviews(&self, filter: &IdentityFilter) -> Result<u64, StorageError> {
        let reviews = self.reviews.lock().expect("review mutex poisoned");
        Ok(reviews.values().filter(|r| filter.matches(r)).count() as u64)
    }

    fn latest_review_by_contact(&self, contact: &str) -> Result<Option<Review>, StorageError> {
        let reviews = self.reviews.lock().expect("review mutex poisoned");
        Ok(reviews
            .values()
            .filter(|r| r.contact == contact)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    fn mark_review_rewarded(&self, id: &ReviewId) -> Result<(), StorageError> {
        let mut reviews = self.reviews.lock().expect("review mutex poisoned");
        let review = reviews.get_mut(id).ok_or(StorageError::NotFound)?;
        review.reward_given = true;
        Ok(())
    }

    fn insert_user(&self, user: User) -> Result<User, StorageError> {
        if self
            .conflict_user_inserts
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StorageError::Conflict);
        }
        let mut users = self.users.lock().expect("user mutex poisoned");
        let clash = users.values().any(|existing| {
            (user.email.is_some() && existing.email == user.email)
                || (user.phone.is_some() && existing.phone == user.phone)
        });
        if clash {
            return Err(StorageError::Conflict);
        }
        users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn find_user(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().expect("user mutex poisoned");
        Ok(users.get(id).cloned())
    }

    fn find_user_by_login(&self, key: &LoginKey) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().expect("user mutex poisoned");
        Ok(users
            .values()
            .find(|user| match key {
                LoginKey::Email(email) => user.email.as_deref() == Some(email),
                LoginKey::Phone(phone) => user.phone.as_deref() == Some(phone),
            })
            .cloned())
    }

    fn users_by_phone(&self, phone: &str) -> Result<Vec<User>, StorageError> {
        let users = self.users.lock().expect("user mutex poisoned");
        Ok(users
            .values()
            .filter(|user| user.phone.as_deref() == Some(phone))
            .cloned()
            .collect())
    }

    fn append_user_review(&self, user: &UserId, review: &ReviewId) -> Result<(), StorageError> {
        let mut users = self.users.lock().expect("user mutex poisoned");
        let user = users.get_mut(user).ok_or(StorageError::NotFound)?;
        user.reviews.push(review.clone());
        Ok(())
    }

    fn insert_coupon(&self, coupon: Coupon) -> Result<Coupon, StorageError> {
        if self
            .fail_coupon_inserts
            .load(std::sync::atomic::Ordering::SeqCst)
        {
            return Err(StorageError::Unavailable("coupon store offline".to_string()));
        }
        let mut coupons = self.coupons.lock().expect("coupon mutex poisoned");
        if coupons.contains_key(&coupon.code) {
            return Err(StorageError::Conflict);
        }
        coupons.insert(coupon.code.clone(), coupon.clone());
        Ok(coupon)
    }

    fn find_coupon(&self, code: &str) -> Result<Option<Coupon>, StorageError> {
        let coupons = self.coupons.lock().expect("coupon mutex poisoned");
        Ok(coupons.get(code).cloned())
    }

    fn redeem_coupon(&self, code: &str, now: DateTime<Utc>) -> Result<Coupon, StorageError> {
        let mut coupons = self.coupons.lock().expect("coupon mutex poisoned");
        let coupon = coupons.get_mut(code).ok_or(StorageError::NotFound)?;
        if coupon.used {
            return Err(StorageError::Conflict);
        }
        coupon.used = true;
        coupon.used_at = Some(now);
        Ok(coupon.clone())
    }

    fn coupons_for_users(&self, users: &[UserId]) -> Result<Vec<Coupon>, StorageError> {
        let coupons = self.coupons.lock().expect("coupon mutex poisoned");
        Ok(coupons
            .values()
            .filter(|c| c.user.as_ref().is_some_and(|u| users.contains(u)))
            .cloned()
            .collect())
    }

    fn insert_alert(&self, alert: Alert) -> Result<Alert, StorageError> {
        let mut alerts = self.alerts.lock().expect("alert mutex poisoned");
        alerts.push(alert.clone());
        Ok(alert)
    }

    fn list_alerts(&self) -> Result<Vec<Alert>, StorageError> {
        let alerts = self.alerts.lock().expect("alert mutex poisoned");
        let mut sorted = alerts.clone();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sorted)
    }
}

/// Every operation fails, for exercising the server-error paths.
pub(crate) struct UnavailableStorage;

impl UnavailableStorage {
    fn down<T>() -> Result<T, StorageError> {
        Err(StorageError::Unavailable("database offline".to_string()))
    }
}

impl Storage for UnavailableStorage {
    fn insert_station(&self, _: Station) -> Result<Station, StorageError> {
        Self::down()
    }
    fn find_station(&self, _: &str) -> Result<Option<Station>, StorageError> {
        Self::down()
    }
    fn get_station(&self, _: &StationId) -> Result<Option<Station>, StorageError> {
        Self::down()
    }
    fn list_stations(&self) -> Result<Vec<Station>, StorageError> {
        Self::down()
    }
    fn nearby_stations(&self, _: GeoPoint, _: f64) -> Result<Vec<Station>, StorageError> {
        Self::down()
    }
    fn station_count(&self) -> Result<u64, StorageError> {
        Self::down()
    }
    fn insert_review(&self, _: Review) -> Result<Review, StorageError> {
        Self::down()
    }
    fn find_review(&self, _: &ReviewId) -> Result<Option<Review>, StorageError> {
        Self::down()
    }
    fn has_recent_review(
        &self,
        _: &StationId,
        _: DateTime<Utc>,
        _: &DuplicateSignals,
    ) -> Result<bool, StorageError> {
        Self::down()
    }
    fn count_reviews(&self, _: &IdentityFilter) -> Result<u64, StorageError> {
        Self::down()
    }
    fn latest_review_by_contact(&self, _: &str) -> Result<Option<Review>, StorageError> {
        Self::down()
    }
    fn mark_review_rewarded(&self, _: &ReviewId) -> Result<(), StorageError> {
        Self::down()
    }
    fn insert_user(&self, _: User) -> Result<User, StorageError> {
        Self::down()
    }
    fn find_user(&self, _: &UserId) -> Result<Option<User>, StorageError> {
        Self::down()
    }
    fn find_user_by_login(&self, _: &LoginKey) -> Result<Option<User>, StorageError> {
        Self::down()
    }
    fn users_by_phone(&self, _: &str) -> Result<Vec<User>, StorageError> {
        Self::down()
    }
    fn append_user_review(&self, _: &UserId, _: &ReviewId) -> Result<(), StorageError> {
        Self::down()
    }
    fn insert_coupon(&self, _: Coupon) -> Result<Coupon, StorageError> {
        Self::down()
    }
    fn find_coupon(&self, _: &str) -> Result<Option<Coupon>, StorageError> {
        Self::down()
    }
    fn redeem_coupon(&self, _: &str, _: DateTime<Utc>) -> Result<Coupon, StorageError> {
        Self::down()
    }
    fn coupons_for_users(&self, _: &[UserId]) -> Result<Vec<Coupon>, StorageError> {
        Self::down()
    }
    fn insert_alert(&self, _: Alert) -> Result<Alert, StorageError> {
        Self::down()
    }
    fn list_alerts(&self) -> Result<Vec<Alert>, StorageError> {
        Self::down()
    }
}
