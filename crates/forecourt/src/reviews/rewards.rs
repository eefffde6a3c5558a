//! Reward Issuer policy: every Nth attributable visit earns a coupon.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Modulus and window knobs for the reward pipeline.
#[derive(Debug, Clone)]
pub struct RewardPolicy {
    pub visit_threshold: u64,
    pub duplicate_window_hours: i64,
    pub coupon_ttl_days: Option<i64>,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            visit_threshold: 5,
            duplicate_window_hours: 24,
            coupon_ttl_days: None,
        }
    }
}

impl RewardPolicy {
    /// A reward is earned iff the inclusive visit count is a positive
    /// multiple of the threshold.
    pub fn earns_reward(&self, visits: u64) -> bool {
        visits > 0 && visits % self.visit_threshold == 0
    }

    /// Visits remaining until the next reward: the full threshold right
    /// after an award, otherwise the distance to the next multiple.
    pub fn visits_left(&self, visits: u64) -> u64 {
        let remainder = visits % self.visit_threshold;
        if remainder == 0 {
            self.visit_threshold
        } else {
            self.visit_threshold - remainder
        }
    }
}

/// Advisory lock table keyed by the identity's contact string. Holding the
/// per-contact lock across persist, count, and issue serializes reward
/// evaluation for one identity, so two concurrent Nth-visit submissions
/// cannot both claim the same slot. Entries nobody holds anymore are
/// evicted on the next access, so the table tracks in-flight submissions
/// rather than every contact ever seen.
#[derive(Default)]
pub(crate) struct IdentityLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdentityLocks {
    pub(crate) fn slot(&self, contact: &str) -> Arc<Mutex<()>> {
        let mut slots = self.slots.lock().expect("identity lock table poisoned");
        // An entry held only by the table belongs to a finished submission.
        slots.retain(|_, slot| Arc::strong_count(slot) > 1);
        slots
            .entry(contact.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

pub(crate) fn hold(slot: &Arc<Mutex<()>>) -> MutexGuard<'_, ()> {
    slot.lock().expect("identity slot poisoned")
}
