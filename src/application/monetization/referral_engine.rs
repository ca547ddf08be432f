//! ReferralEngine - records referrals and credits referrers.
//!
//! Fulfillment is claim-then-credit: the `rewarded` flag is flipped with a
//! compare-and-set first, so two concurrent calls cannot both credit. If the
//! credit cannot be applied the claim is released again.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::MonetizationConfig;
use crate::domain::foundation::{ReferralId, UserId};
use crate::domain::monetization::{MonetizationError, Referral, TierName};
use crate::ports::{
    Clock, ReferralInsert, ReferralRepository, RewardClaim, SubscriptionRepository,
};

pub struct ReferralEngine {
    referrals: Arc<dyn ReferralRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    clock: Arc<dyn Clock>,
    reward_tier: TierName,
    reward_days: BTreeMap<TierName, u32>,
}

impl ReferralEngine {
    pub fn new(
        config: &MonetizationConfig,
        referrals: Arc<dyn ReferralRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            referrals,
            subscriptions,
            clock,
            reward_tier: config.referral_reward_tier,
            reward_days: config.referral_reward_days.clone(),
        }
    }

    /// Records that `referrer` brought in `referred`.
    ///
    /// The reward tier is the configured one, whatever the referred user
    /// later subscribes to.
    ///
    /// # Errors
    ///
    /// - `InvalidReferral` for a self-referral
    /// - `DuplicateReferral` if the pair was already recorded
    pub async fn process_referral(
        &self,
        referrer: &UserId,
        referred: &UserId,
    ) -> Result<Referral, MonetizationError> {
        let referral = Referral::record(
            referrer.clone(),
            referred.clone(),
            self.reward_tier,
            self.clock.now(),
        )?;

        match self.referrals.insert_if_absent(&referral).await? {
            ReferralInsert::Inserted => {
                tracing::info!(
                    referral_id = %referral.id,
                    referrer = %referrer,
                    referred = %referred,
                    reward_tier = %self.reward_tier,
                    "Referral recorded"
                );
                Ok(referral)
            }
            ReferralInsert::Duplicate(existing) => {
                tracing::debug!(
                    referral_id = %existing.id,
                    referrer = %referrer,
                    referred = %referred,
                    "Duplicate referral rejected"
                );
                Err(MonetizationError::duplicate_referral(
                    referrer.clone(),
                    referred.clone(),
                ))
            }
        }
    }

    /// Credits the referrer and marks the referral rewarded.
    ///
    /// Only the referrer's active subscription is credited. A dated one is
    /// extended from `max(end, now)`; an open-ended one banks the days, so
    /// its end date does not move until the subscription is cancelled.
    ///
    /// # Errors
    ///
    /// - `NotFound` for an unknown referral, or when the referrer has no
    ///   active subscription (the referral stays pending)
    /// - `AlreadyFulfilled` if the reward was already credited
    pub async fn fulfill_referral(&self, id: &ReferralId) -> Result<Referral, MonetizationError> {
        let referral = self
            .referrals
            .find(id)
            .await?
            .ok_or_else(|| MonetizationError::not_found("Referral", id))?;
        if referral.rewarded {
            return Err(MonetizationError::already_fulfilled(*id));
        }
        let active = self
            .subscriptions
            .current(&referral.referrer)
            .await?
            .filter(|s| s.active);
        if active.is_none() {
            return Err(MonetizationError::not_found("Subscription", &referral.referrer));
        }

        let now = self.clock.now();
        let claimed = match self.referrals.claim_reward(id, now).await? {
            RewardClaim::Claimed(referral) => referral,
            RewardClaim::AlreadyRewarded(_) => {
                return Err(MonetizationError::already_fulfilled(*id));
            }
            RewardClaim::Missing => return Err(MonetizationError::not_found("Referral", id)),
        };

        let days = self.days_for(claimed.reward_tier);
        match self
            .subscriptions
            .extend_active(&claimed.referrer, days, now)
            .await
        {
            Ok(Some(subscription)) => {
                tracing::info!(
                    referral_id = %id,
                    referrer = %claimed.referrer,
                    subscription_id = %subscription.id,
                    days,
                    end = ?subscription.end,
                    banked_credit_days = subscription.banked_credit_days,
                    "Referral fulfilled"
                );
                Ok(claimed)
            }
            Ok(None) => {
                self.release_claim(id).await;
                Err(MonetizationError::not_found("Subscription", &claimed.referrer))
            }
            Err(e) => {
                self.release_claim(id).await;
                Err(e.into())
            }
        }
    }

    /// Referrals made by the user, oldest first.
    pub async fn referrals_by(&self, referrer: &UserId) -> Result<Vec<Referral>, MonetizationError> {
        Ok(self.referrals.list_by_referrer(referrer).await?)
    }

    /// Referrals made by the user that are still waiting for their reward.
    pub async fn pending_referrals(
        &self,
        referrer: &UserId,
    ) -> Result<Vec<Referral>, MonetizationError> {
        let mut referrals = self.referrals_by(referrer).await?;
        referrals.retain(|r| !r.rewarded);
        Ok(referrals)
    }

    fn days_for(&self, tier: Option<TierName>) -> u32 {
        match tier.and_then(|t| self.reward_days.get(&t)) {
            Some(days) => *days,
            None => {
                tracing::warn!(tier = ?tier, "No referral reward policy for tier; crediting 0 days");
                0
            }
        }
    }

    async fn release_claim(&self, id: &ReferralId) {
        if let Err(e) = self.referrals.release_reward(id).await {
            tracing::error!(
                referral_id = %id,
                error = %e,
                "Failed to release referral claim; referral left marked rewarded"
            );
        }
    }
}
