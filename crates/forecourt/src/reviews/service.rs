//! The review pipeline and coupon redemption, composed over the storage
//! port.
//!
//! Submission ordering is fixed: validate, admit past the duplicate guard,
//! persist the review, count attributable visits (inclusive of the new
//! review), then issue a coupon when the count lands on the threshold.
//! The count-and-issue section runs under a per-contact advisory lock.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde::Serialize;

use super::guard;
use super::identity;
use super::rewards::{hold, IdentityLocks, RewardPolicy};
use super::submission::{ReviewSubmission, ValidationError};
use crate::auth::Identity;
use crate::domain::{Coupon, CouponStateError, Review, ReviewId};
use crate::storage::{DuplicateSignals, Storage, StorageError};

pub struct ReviewService<S> {
    storage: Arc<S>,
    policy: RewardPolicy,
    locks: IdentityLocks,
}

/// Success payload for a submission: the persisted review, the coupon when
/// one was issued, and the running visit arithmetic.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionReceipt {
    pub review: Review,
    pub coupon: Option<Coupon>,
    pub visits: u64,
    pub visits_left: u64,
}

/// A redeemed coupon plus the display name of the station it applies to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionReceipt {
    pub coupon: Coupon,
    pub station: Option<String>,
}

/// Contact details of whoever holds a coupon or phone number.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderProfile {
    pub name: Option<String>,
    pub contact: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Visit history and coupons attributable to one phone number.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardsSearch {
    pub visits: u64,
    pub coupons: Vec<Coupon>,
    pub profile: HolderProfile,
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("station not found")]
    StationNotFound,
    #[error("you can only submit one review per station every 24 hours")]
    DuplicateWindow,
    #[error("coupon not found")]
    CouponNotFound,
    #[error("coupon has already been redeemed")]
    CouponAlreadyRedeemed,
    #[error("coupon has expired")]
    CouponExpired,
    #[error("you are not authorized to claim this coupon")]
    NotCouponOwner,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<CouponStateError> for ReviewServiceError {
    fn from(value: CouponStateError) -> Self {
        match value {
            CouponStateError::AlreadyRedeemed => Self::CouponAlreadyRedeemed,
            CouponStateError::Expired => Self::CouponExpired,
        }
    }
}

impl<S: Storage> ReviewService<S> {
    pub fn new(storage: Arc<S>, policy: RewardPolicy) -> Self {
        Self {
            storage,
            policy,
            locks: IdentityLocks::default(),
        }
    }

    /// Run a validated submission through the duplicate guard, persist it,
    /// and evaluate the reward threshold.
    pub fn submit(
        &self,
        identity: &Identity,
        source_addr: Option<String>,
        submission: ReviewSubmission,
    ) -> Result<SubmissionReceipt, ReviewServiceError> {
        let draft = submission.validate()?;
        let now = Utc::now();

        let station = self
            .storage
            .find_station(&draft.station_id)?
            .ok_or(ReviewServiceError::StationNotFound)?;

        let signals = DuplicateSignals {
            user: identity.user.clone(),
            device_id: draft.device_id.clone(),
            source_addr: source_addr.clone(),
        };
        if guard::is_duplicate(
            &*self.storage,
            &station.id,
            &signals,
            self.policy.duplicate_window_hours,
            now,
        )? {
            return Err(ReviewServiceError::DuplicateWindow);
        }

        let slot = self.locks.slot(&draft.contact);
        let _serialized = hold(&slot);

        let mut review = self.storage.insert_review(Review {
            id: ReviewId::generate(),
            station: station.id.clone(),
            rating: draft.rating,
            cleanliness: draft.cleanliness,
            service_speed: draft.service_speed,
            staff_friendliness: draft.staff_friendliness,
            comment: draft.comment,
            name: draft.name,
            contact: draft.contact.clone(),
            gps: draft.gps,
            device_id: draft.device_id,
            user: identity.user.clone(),
            source_addr,
            created_at: now,
            reward_given: false,
        })?;

        // Best effort: developer/test identities may not resolve to a stored
        // user record, and a failed link must not abort the submission.
        if let Some(user_id) = &identity.user {
            if let Err(err) = self.storage.append_user_review(user_id, &review.id) {
                tracing::debug!(%user_id, error = %err, "skipping review-to-profile link");
            }
        }

        let filter = identity::resolve(&*self.storage, &draft.contact)?;
        let visits = self.storage.count_reviews(&filter)?;

        let coupon = if self.policy.earns_reward(visits) {
            let expires_at = self
                .policy
                .coupon_ttl_days
                .map(|days| now + Duration::days(days));
            let coupon = self.storage.insert_coupon(Coupon::issue(
                identity.user.clone(),
                review.id.clone(),
                station.id.clone(),
                now,
                expires_at,
            ))?;
            self.storage.mark_review_rewarded(&review.id)?;
            review.reward_given = true;
            tracing::info!(code = %coupon.code, visits, "visit threshold reached, coupon issued");
            Some(coupon)
        } else {
            None
        };

        Ok(SubmissionReceipt {
            review,
            coupon,
            visits,
            visits_left: self.policy.visits_left(visits),
        })
    }

    /// Unauthenticated redemption: anyone holding the code may redeem it.
    pub fn scan(&self, code: &str) -> Result<RedemptionReceipt, ReviewServiceError> {
        let now = Utc::now();
        let coupon = self
            .storage
            .find_coupon(code)?
            .ok_or(ReviewServiceError::CouponNotFound)?;
        coupon.ensure_redeemable(now)?;
        self.redeem(code)
    }

    /// Authenticated redemption with the ownership check; administrators
    /// may claim on behalf of any holder.
    pub fn claim(
        &self,
        identity: &Identity,
        code: &str,
    ) -> Result<RedemptionReceipt, ReviewServiceError> {
        let now = Utc::now();
        let coupon = self
            .storage
            .find_coupon(code)?
            .ok_or(ReviewServiceError::CouponNotFound)?;
        coupon.ensure_redeemable(now)?;
        if let Some(owner) = &coupon.user {
            let caller_owns = identity.user.as_ref() == Some(owner);
            if !caller_owns && !identity.is_admin {
                return Err(ReviewServiceError::NotCouponOwner);
            }
        }
        self.redeem(code)
    }

    fn redeem(&self, code: &str) -> Result<RedemptionReceipt, ReviewServiceError> {
        let coupon = self
            .storage
            .redeem_coupon(code, Utc::now())
            .map_err(|err| match err {
                StorageError::NotFound => ReviewServiceError::CouponNotFound,
                StorageError::Conflict => ReviewServiceError::CouponAlreadyRedeemed,
                other => ReviewServiceError::Storage(other),
            })?;
        let station = self
            .storage
            .get_station(&coupon.station)?
            .map(|station| station.name);
        tracing::info!(code = %coupon.code, "coupon redeemed");
        Ok(RedemptionReceipt { coupon, station })
    }

    /// Profile snapshot for the holder of a coupon code.
    pub fn holder_profile(&self, code: &str) -> Result<HolderProfile, ReviewServiceError> {
        let coupon = self
            .storage
            .find_coupon(code)?
            .ok_or(ReviewServiceError::CouponNotFound)?;

        let mut profile = HolderProfile::default();
        if let Some(review) = self.storage.find_review(&coupon.review)? {
            profile.name = Some(review.name);
            profile.contact = Some(review.contact);
        }
        if let Some(user) = coupon
            .user
            .as_ref()
            .map(|id| self.storage.find_user(id))
            .transpose()?
            .flatten()
        {
            profile.email = user.email;
            profile.phone = user.phone;
        }
        Ok(profile)
    }

    /// Visit history for a phone number, using the same attribution union
    /// as the reward pipeline.
    pub fn search(&self, phone: &str) -> Result<RewardsSearch, ReviewServiceError> {
        let filter = identity::resolve(&*self.storage, phone)?;
        let visits = self.storage.count_reviews(&filter)?;
        let coupons = self.storage.coupons_for_users(&filter.user_ids)?;

        let mut profile = HolderProfile::default();
        if let Some(latest) = self.storage.latest_review_by_contact(phone)? {
            profile.name = Some(latest.name);
            profile.contact = Some(latest.contact);
        }
        if let Some(first) = filter
            .user_ids
            .first()
            .map(|id| self.storage.find_user(id))
            .transpose()?
            .flatten()
        {
            profile.email = first.email;
            profile.phone = first.phone;
        }

        Ok(RewardsSearch {
            visits,
            coupons,
            profile,
        })
    }
}
