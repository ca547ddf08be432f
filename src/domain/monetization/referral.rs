//! Referral entity and its fulfillment state machine.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ReferralId, StateMachine, Timestamp, UserId};

use super::{MonetizationError, TierName};

/// Lifecycle of a referral reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferralStatus {
    /// Recorded, reward not yet credited.
    Pending,

    /// Reward credited to the referrer. Terminal.
    Fulfilled,
}

impl StateMachine for ReferralStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        matches!(
            (self, target),
            (ReferralStatus::Pending, ReferralStatus::Fulfilled)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        match self {
            ReferralStatus::Pending => vec![ReferralStatus::Fulfilled],
            ReferralStatus::Fulfilled => vec![],
        }
    }
}

/// A recorded referral from one user to another.
///
/// # Invariants
///
/// - `referrer != referred`
/// - `(referrer, referred)` is unique across the store
/// - `rewarded` goes false -> true at most once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub id: ReferralId,
    pub referrer: UserId,
    pub referred: UserId,

    /// Tier whose reward policy applies; `None` if the tier was removed.
    pub reward_tier: Option<TierName>,

    pub created_at: Timestamp,
    pub rewarded: bool,
    pub rewarded_at: Option<Timestamp>,
}

impl Referral {
    /// Records a new pending referral.
    ///
    /// # Errors
    ///
    /// `InvalidReferral` when a user refers themselves.
    pub fn record(
        referrer: UserId,
        referred: UserId,
        reward_tier: TierName,
        now: Timestamp,
    ) -> Result<Self, MonetizationError> {
        if referrer == referred {
            return Err(MonetizationError::invalid_referral(referrer));
        }
        Ok(Self {
            id: ReferralId::new(),
            referrer,
            referred,
            reward_tier: Some(reward_tier),
            created_at: now,
            rewarded: false,
            rewarded_at: None,
        })
    }

    pub fn status(&self) -> ReferralStatus {
        if self.rewarded {
            ReferralStatus::Fulfilled
        } else {
            ReferralStatus::Pending
        }
    }

    /// Moves the referral to `Fulfilled`.
    ///
    /// # Errors
    ///
    /// `AlreadyFulfilled` if the reward was already credited.
    pub fn mark_fulfilled(&mut self, now: Timestamp) -> Result<(), MonetizationError> {
        self.status()
            .transition_to(ReferralStatus::Fulfilled)
            .map_err(|_| MonetizationError::already_fulfilled(self.id))?;
        self.rewarded = true;
        self.rewarded_at = Some(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("2025-03-01T12:00:00Z").unwrap()
    }

    #[test]
    fn record_starts_pending() {
        let referral = Referral::record(user("u1"), user("u2"), TierName::Basic, now()).unwrap();
        assert_eq!(referral.status(), ReferralStatus::Pending);
        assert!(!referral.rewarded);
        assert_eq!(referral.reward_tier, Some(TierName::Basic));
    }

    #[test]
    fn self_referral_is_rejected() {
        let err = Referral::record(user("u1"), user("u1"), TierName::Basic, now()).unwrap_err();
        assert_eq!(err, MonetizationError::InvalidReferral(user("u1")));
    }

    #[test]
    fn fulfill_once_then_reject() {
        let mut referral =
            Referral::record(user("u1"), user("u2"), TierName::Basic, now()).unwrap();

        referral.mark_fulfilled(now()).unwrap();
        assert_eq!(referral.status(), ReferralStatus::Fulfilled);
        assert_eq!(referral.rewarded_at, Some(now()));

        let err = referral.mark_fulfilled(now().add_days(1)).unwrap_err();
        assert_eq!(err, MonetizationError::AlreadyFulfilled(referral.id));
        assert_eq!(referral.rewarded_at, Some(now()));
    }

    #[test]
    fn fulfilled_is_terminal() {
        assert!(ReferralStatus::Fulfilled.is_terminal());
        assert!(!ReferralStatus::Fulfilled.can_transition_to(&ReferralStatus::Pending));
    }
}
