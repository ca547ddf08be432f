//! Subscription repository port.
//!
//! Stores every subscription record a user ever had. The latest record is the
//! user's *current* subscription; at most one record per user is active.
//!
//! # Design
//!
//! - **Arena per user**: records are appended, never deleted
//! - **Atomic replace**: superseding the active record and inserting the new
//!   one is a single operation, so concurrent subscribes cannot leave two
//!   active records behind. Unused referral credit moves to the new record
//!   inside the same operation.
//! - **In-place credit**: extension runs as one conditional update against
//!   the active record; closing is keyed by record id
//!
//! # Example
//!
//! ```ignore
//! let sub = Subscription::activate(user_id.clone(), TierName::Basic, None, clock.now());
//! let replacement = repo.replace_active(&sub).await?;
//! assert!(replacement.superseded.map_or(true, |old| !old.active));
//! ```

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::domain::monetization::Subscription;

/// Outcome of [`SubscriptionRepository::replace_active`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    /// The new active record as stored, including inherited credit.
    pub current: Subscription,

    /// The previously active record, now deactivated.
    pub superseded: Option<Subscription>,
}

/// Repository port for Subscription records.
///
/// Implementations must ensure:
/// - At most one active record per user, under concurrent writers
/// - `current` returns the most recently started record
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    /// Deactivates the user's active record (if any) and stores
    /// `subscription` as the new current record, atomically.
    ///
    /// The new record inherits the superseded one's unused credit (see
    /// [`Subscription::inherit_credit`]).
    async fn replace_active(&self, subscription: &Subscription)
        -> Result<Replacement, DomainError>;

    /// The user's most recent record, active or not.
    async fn current(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError>;

    /// All of the user's records, oldest first.
    async fn history(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError>;

    /// Sets `active = false` on the current record.
    ///
    /// Returns the record after the update, or `None` if the user has no
    /// record. Calling it on an inactive record changes nothing.
    async fn deactivate_current(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Credits `days` to the active record (see
    /// [`Subscription::extend_validity`]).
    ///
    /// Returns the updated record, or `None` if no record is active.
    async fn extend_active(
        &self,
        user_id: &UserId,
        days: u32,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError>;

    /// Fixes the end date of record `id` at `now` plus banked credit (see
    /// [`Subscription::close_at_credit_end`]).
    ///
    /// Returns the updated record, or `None` if `id` is no longer the user's
    /// active record.
    async fn close_active(
        &self,
        user_id: &UserId,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subscription_repository_is_object_safe() {
        fn _accepts_dyn(_repo: &dyn SubscriptionRepository) {}
    }
}
