//! Duplicate Guard: at most one review per station per visitor inside a
//! rolling window, across user id, device id, and source address.

use chrono::{DateTime, Duration, Utc};

use crate::domain::StationId;
use crate::storage::{DuplicateSignals, Storage, StorageError};

/// True when a prior review for the station inside the window matches any
/// of the present signals. With no signal at all the check is skipped and
/// the submission admitted; that bypass is logged so operators can see how
/// often it happens.
pub fn is_duplicate<S: Storage>(
    storage: &S,
    station: &StationId,
    signals: &DuplicateSignals,
    window_hours: i64,
    now: DateTime<Utc>,
) -> Result<bool, StorageError> {
    if signals.is_empty() {
        tracing::warn!(%station, "duplicate guard skipped: no identity signal on submission");
        return Ok(false);
    }
    let since = now - Duration::hours(window_hours);
    storage.has_recent_review(station, since, signals)
}
