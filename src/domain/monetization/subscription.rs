//! Subscription entity.
//!
//! A user's subscription record. Each user owns a history of records of
//! which at most one is active; superseded records are kept, never deleted.
//!
//! # Design Decisions
//!
//! - **Open-ended by default**: billing renews externally, so `end` is `None`
//!   until cancellation fixes it
//! - **Banked credit**: referral days earned while open-ended accumulate in
//!   `banked_credit_days` and are honored once an end date is set
//! - **Explicit time**: every time-dependent method takes `now`

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{SubscriptionId, Timestamp, UserId};

use super::TierName;

/// A user's subscription record.
///
/// # Invariants
///
/// - `start` never changes after creation
/// - `is_valid_at(now) == active && (end.is_none() || end > now)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,

    pub user_id: UserId,

    /// Plan reference. `None` means the tier was removed; the record is then
    /// treated as suspended.
    pub tier: Option<TierName>,

    pub start: Timestamp,

    /// End of validity; `None` means open-ended.
    pub end: Option<Timestamp>,

    pub active: bool,

    /// Billing subscription id returned by the payment processor.
    pub external_id: Option<String>,

    /// Referral credit accrued while the subscription was open-ended.
    pub banked_credit_days: u32,

    pub updated_at: Timestamp,
}

impl Subscription {
    /// Creates a new active, open-ended subscription.
    pub fn activate(
        user_id: UserId,
        tier: TierName,
        external_id: Option<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            tier: Some(tier),
            start: now,
            end: None,
            active: true,
            external_id,
            banked_credit_days: 0,
            updated_at: now,
        }
    }

    /// Validity at the given instant.
    pub fn is_valid_at(&self, now: Timestamp) -> bool {
        self.active && self.end.map_or(true, |end| end > now)
    }

    /// Marks the record inactive. Returns false if it already was.
    pub fn deactivate(&mut self, now: Timestamp) -> bool {
        if !self.active {
            return false;
        }
        self.active = false;
        self.updated_at = now;
        true
    }

    /// Credits `days` of validity.
    ///
    /// With an end date the window grows from `max(end, now)` so credit
    /// earned after a lapse is not swallowed by the past. Open-ended
    /// subscriptions bank the days instead.
    pub fn extend_validity(&mut self, days: u32, now: Timestamp) {
        match self.end {
            Some(end) => {
                let base = if end > now { end } else { now };
                self.end = Some(base.plus(Duration::days(i64::from(days))));
            }
            None => {
                self.banked_credit_days = self.banked_credit_days.saturating_add(days);
            }
        }
        self.updated_at = now;
    }

    /// Fixes the end date at `now` plus any banked credit.
    ///
    /// Used when billing is cancelled: the user keeps access for the credit
    /// they already earned.
    pub fn close_at_credit_end(&mut self, now: Timestamp) {
        let end = now.plus(Duration::days(i64::from(self.banked_credit_days)));
        self.end = Some(end);
        self.banked_credit_days = 0;
        self.updated_at = now;
    }

    /// Referral credit this record still owes at `now`: banked days plus the
    /// whole days left before a fixed end date.
    ///
    /// An end date is only ever set by cancellation, so every remaining day
    /// past it is earned credit rather than paid time.
    pub fn unused_credit_days(&self, now: Timestamp) -> u32 {
        let remaining = match self.end {
            Some(end) if end > now => {
                u32::try_from(end.duration_since(&now).num_days()).unwrap_or(u32::MAX)
            }
            _ => 0,
        };
        self.banked_credit_days.saturating_add(remaining)
    }

    /// Takes over the unused credit of the record this one supersedes.
    pub fn inherit_credit(&mut self, superseded: &Subscription, now: Timestamp) {
        self.banked_credit_days = self
            .banked_credit_days
            .saturating_add(superseded.unused_credit_days(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("2025-03-01T12:00:00Z").unwrap()
    }

    fn subscription() -> Subscription {
        Subscription::activate(
            UserId::new("u1").unwrap(),
            TierName::Basic,
            Some("sub_123".to_string()),
            now(),
        )
    }

    #[test]
    fn new_subscription_is_active_and_open_ended() {
        let sub = subscription();
        assert!(sub.active);
        assert!(sub.end.is_none());
        assert_eq!(sub.start, now());
        assert_eq!(sub.tier, Some(TierName::Basic));
        assert!(sub.is_valid_at(now().add_days(3650)));
    }

    #[test]
    fn passed_end_invalidates_even_when_active() {
        let mut sub = subscription();
        sub.end = Some(now().add_days(1));

        assert!(sub.is_valid_at(now()));
        assert!(!sub.is_valid_at(now().add_days(1)));
        assert!(!sub.is_valid_at(now().add_days(2)));
    }

    #[test]
    fn inactive_is_never_valid() {
        let mut sub = subscription();
        assert!(sub.deactivate(now()));
        assert!(!sub.is_valid_at(now()));
    }

    #[test]
    fn deactivate_is_idempotent() {
        let mut sub = subscription();
        assert!(sub.deactivate(now()));
        let snapshot = sub.clone();
        assert!(!sub.deactivate(now().add_days(1)));
        assert_eq!(sub, snapshot);
    }

    #[test]
    fn extend_with_future_end_adds_to_end() {
        let mut sub = subscription();
        let end = now().add_days(5);
        sub.end = Some(end);

        sub.extend_validity(14, now());
        assert_eq!(sub.end, Some(end.add_days(14)));
    }

    #[test]
    fn extend_with_lapsed_end_starts_from_now() {
        let mut sub = subscription();
        sub.end = Some(now().add_days(-3));

        sub.extend_validity(7, now());
        assert_eq!(sub.end, Some(now().add_days(7)));
    }

    #[test]
    fn extend_open_ended_banks_credit() {
        let mut sub = subscription();
        sub.extend_validity(14, now());
        sub.extend_validity(7, now());

        assert!(sub.end.is_none());
        assert_eq!(sub.banked_credit_days, 21);
    }

    #[test]
    fn closing_honors_banked_credit() {
        let mut sub = subscription();
        sub.extend_validity(14, now());
        sub.close_at_credit_end(now());

        assert_eq!(sub.end, Some(now().add_days(14)));
        assert_eq!(sub.banked_credit_days, 0);
        assert!(sub.is_valid_at(now().add_days(13)));
        assert!(!sub.is_valid_at(now().add_days(14)));
    }

    #[test]
    fn unused_credit_counts_banked_and_remaining_days() {
        let mut open = subscription();
        open.extend_validity(14, now());
        assert_eq!(open.unused_credit_days(now()), 14);

        let mut cancelled = subscription();
        cancelled.extend_validity(10, now());
        cancelled.close_at_credit_end(now());
        assert_eq!(cancelled.unused_credit_days(now().add_days(4)), 6);
        assert_eq!(cancelled.unused_credit_days(now().add_days(12)), 0);
    }

    #[test]
    fn successor_inherits_unused_credit() {
        let mut old = subscription();
        old.extend_validity(14, now());
        let mut new = Subscription::activate(
            UserId::new("u1").unwrap(),
            TierName::Premium,
            None,
            now().add_days(1),
        );

        new.inherit_credit(&old, now().add_days(1));

        assert_eq!(new.banked_credit_days, 14);
        assert!(new.end.is_none());
    }
}
