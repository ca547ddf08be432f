//! In-memory referral repository.
//!
//! Lock order is always `pairs` before `referrals`.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, ErrorCode, ReferralId, Timestamp, UserId};
use crate::domain::monetization::Referral;
use crate::ports::{ReferralInsert, ReferralRepository, RewardClaim};

/// Referral store with a unique (referrer, referred) index.
#[derive(Debug, Default)]
pub struct InMemoryReferralRepository {
    referrals: DashMap<ReferralId, Referral>,
    pairs: DashMap<(UserId, UserId), ReferralId>,
}

impl InMemoryReferralRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.referrals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.referrals.is_empty()
    }
}

#[async_trait]
impl ReferralRepository for InMemoryReferralRepository {
    async fn insert_if_absent(&self, referral: &Referral) -> Result<ReferralInsert, DomainError> {
        let key = (referral.referrer.clone(), referral.referred.clone());
        match self.pairs.entry(key) {
            Entry::Occupied(existing) => {
                let existing = self
                    .referrals
                    .get(existing.get())
                    .map(|r| r.value().clone())
                    .ok_or_else(|| {
                        DomainError::new(
                            ErrorCode::InternalError,
                            "Referral pair index points at a missing record",
                        )
                    })?;
                Ok(ReferralInsert::Duplicate(existing))
            }
            Entry::Vacant(slot) => {
                self.referrals.insert(referral.id, referral.clone());
                slot.insert(referral.id);
                Ok(ReferralInsert::Inserted)
            }
        }
    }

    async fn find(&self, id: &ReferralId) -> Result<Option<Referral>, DomainError> {
        Ok(self.referrals.get(id).map(|r| r.value().clone()))
    }

    async fn find_by_pair(
        &self,
        referrer: &UserId,
        referred: &UserId,
    ) -> Result<Option<Referral>, DomainError> {
        let id = self
            .pairs
            .get(&(referrer.clone(), referred.clone()))
            .map(|id| *id.value());
        Ok(id.and_then(|id| self.referrals.get(&id).map(|r| r.value().clone())))
    }

    async fn claim_reward(
        &self,
        id: &ReferralId,
        now: Timestamp,
    ) -> Result<RewardClaim, DomainError> {
        let Some(mut referral) = self.referrals.get_mut(id) else {
            return Ok(RewardClaim::Missing);
        };
        let claim = match referral.mark_fulfilled(now) {
            Ok(()) => RewardClaim::Claimed(referral.clone()),
            Err(_) => RewardClaim::AlreadyRewarded(referral.clone()),
        };
        Ok(claim)
    }

    async fn release_reward(&self, id: &ReferralId) -> Result<(), DomainError> {
        if let Some(mut referral) = self.referrals.get_mut(id) {
            referral.rewarded = false;
            referral.rewarded_at = None;
        }
        Ok(())
    }

    async fn list_by_referrer(&self, referrer: &UserId) -> Result<Vec<Referral>, DomainError> {
        let mut referrals: Vec<Referral> = self
            .referrals
            .iter()
            .filter(|r| &r.referrer == referrer)
            .map(|r| r.value().clone())
            .collect();
        referrals.sort_by_key(|r| r.created_at);
        Ok(referrals)
    }
}
