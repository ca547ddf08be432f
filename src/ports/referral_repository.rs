//! Referral repository port.
//!
//! # Design
//!
//! - **Unique pair**: duplicate detection and insert are one atomic step
//! - **Compare-and-set claim**: the `rewarded` flag flips false -> true in a
//!   single conditional update, so concurrent fulfillments credit once
//! - **Compensation**: `release_reward` undoes a claim whose credit could not
//!   be applied

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ReferralId, Timestamp, UserId};
use crate::domain::monetization::Referral;

/// Outcome of [`ReferralRepository::insert_if_absent`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferralInsert {
    /// The referral was stored.
    Inserted,

    /// A referral for the same (referrer, referred) pair already exists.
    Duplicate(Referral),
}

/// Outcome of [`ReferralRepository::claim_reward`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RewardClaim {
    /// This caller flipped the flag; the referral is returned as updated.
    Claimed(Referral),

    /// The flag was already set.
    AlreadyRewarded(Referral),

    /// No referral with that id.
    Missing,
}

/// Repository port for Referral records.
#[async_trait]
pub trait ReferralRepository: Send + Sync {
    /// Stores the referral unless its pair already exists.
    async fn insert_if_absent(&self, referral: &Referral) -> Result<ReferralInsert, DomainError>;

    async fn find(&self, id: &ReferralId) -> Result<Option<Referral>, DomainError>;

    async fn find_by_pair(
        &self,
        referrer: &UserId,
        referred: &UserId,
    ) -> Result<Option<Referral>, DomainError>;

    /// Atomically sets `rewarded = true` if it is currently false.
    async fn claim_reward(&self, id: &ReferralId, now: Timestamp)
        -> Result<RewardClaim, DomainError>;

    /// Reverts a claim made by `claim_reward`.
    async fn release_reward(&self, id: &ReferralId) -> Result<(), DomainError>;

    /// Referrals made by the user, oldest first.
    async fn list_by_referrer(&self, referrer: &UserId) -> Result<Vec<Referral>, DomainError>;
}
