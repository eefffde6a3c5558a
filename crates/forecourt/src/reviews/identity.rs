//! Identity Resolver: collapse the contact string and any user accounts
//! sharing that phone number into one attribution filter.
//!
//! The same physical visitor may review while logged out (contact only) and
//! while logged in (user-linked), so both keys count toward one total.

use crate::storage::{IdentityFilter, Storage, StorageError};

pub fn resolve<S: Storage>(storage: &S, contact: &str) -> Result<IdentityFilter, StorageError> {
    let user_ids = storage
        .users_by_phone(contact)?
        .into_iter()
        .map(|user| user.id)
        .collect();
    Ok(IdentityFilter {
        contact: contact.to_string(),
        user_ids,
    })
}
