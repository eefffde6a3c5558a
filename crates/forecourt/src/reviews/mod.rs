//! Review submission, visit counting, and coupon issuance/redemption.
//!
//! The pipeline is split along its seams: typed validation, the identity
//! resolver, the duplicate guard, the reward policy, and the service that
//! composes them over the storage port.

pub mod guard;
pub mod identity;
pub mod rewards;
pub mod router;
pub mod service;
pub mod submission;

#[cfg(test)]
mod tests;

pub use rewards::RewardPolicy;
pub use router::{review_router, ReviewRouterState};
pub use service::{
    HolderProfile, RedemptionReceipt, ReviewService, ReviewServiceError, RewardsSearch,
    SubmissionReceipt,
};
pub use submission::{ReviewDraft, ReviewSubmission, ValidationError};
