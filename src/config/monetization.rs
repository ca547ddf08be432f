//! Monetization configuration
//!
//! Tier pricing, reward windows and referral policy. Defaults reproduce the
//! launch pricing: basic at $5 and premium at $10 per month.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::error::ValidationError;
use crate::domain::monetization::{Tier, TierCatalog, TierName};

/// Longest accepted ad reward window (one week).
const MAX_AD_REWARD_WINDOW_HOURS: u32 = 24 * 7;

/// Monetization policy, injected into the services at construction.
#[derive(Debug, Clone, Deserialize)]
pub struct MonetizationConfig {
    /// Tier definitions loaded into the `TierCatalog`
    #[serde(default = "default_tiers")]
    pub tiers: Vec<Tier>,

    /// How long an ad reward stays active, in hours
    #[serde(default = "default_ad_reward_window_hours")]
    pub ad_reward_window_hours: u32,

    /// Tier whose reward policy every new referral uses.
    ///
    /// Fixed regardless of what the referred user subscribes to.
    #[serde(default = "default_referral_reward_tier")]
    pub referral_reward_tier: TierName,

    /// Days of validity credited to the referrer, per reward tier
    #[serde(default = "default_referral_reward_days")]
    pub referral_reward_days: BTreeMap<TierName, u32>,

    /// Billing interval requested from the payment processor
    #[serde(default = "default_billing_interval_months")]
    pub billing_interval_months: u32,

    /// Upper bound on a single payment gateway call, in seconds
    #[serde(default = "default_payment_timeout_secs")]
    pub payment_timeout_secs: u64,
}

impl MonetizationConfig {
    pub fn ad_reward_window(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.ad_reward_window_hours))
    }

    pub fn payment_timeout(&self) -> Duration {
        Duration::from_secs(self.payment_timeout_secs)
    }

    /// Days credited for a referral rewarded under `tier`; zero when the tier
    /// has no policy.
    pub fn referral_days_for(&self, tier: TierName) -> u32 {
        self.referral_reward_days.get(&tier).copied().unwrap_or(0)
    }

    /// Validate monetization configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let catalog = TierCatalog::from_config(self)
            .map_err(|e| ValidationError::InvalidCatalog(e.to_string()))?;

        if !(1..=MAX_AD_REWARD_WINDOW_HOURS).contains(&self.ad_reward_window_hours) {
            return Err(ValidationError::InvalidAdRewardWindow {
                max: MAX_AD_REWARD_WINDOW_HOURS,
                actual: self.ad_reward_window_hours,
            });
        }
        if !catalog.contains(self.referral_reward_tier) {
            return Err(ValidationError::UnknownReferralRewardTier(
                self.referral_reward_tier.to_string(),
            ));
        }
        if self.referral_days_for(self.referral_reward_tier) == 0 {
            return Err(ValidationError::MissingReferralDays(
                self.referral_reward_tier.to_string(),
            ));
        }
        if !(1..=12).contains(&self.billing_interval_months) {
            return Err(ValidationError::InvalidBillingInterval(
                self.billing_interval_months,
            ));
        }
        if self.payment_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("monetization.payment_timeout_secs"));
        }
        Ok(())
    }
}

impl Default for MonetizationConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            ad_reward_window_hours: default_ad_reward_window_hours(),
            referral_reward_tier: default_referral_reward_tier(),
            referral_reward_days: default_referral_reward_days(),
            billing_interval_months: default_billing_interval_months(),
            payment_timeout_secs: default_payment_timeout_secs(),
        }
    }
}

fn default_tiers() -> Vec<Tier> {
    vec![
        Tier::new(
            TierName::Basic,
            500,
            ["remove_ads", "meal_planning", "grocery_list"],
        ),
        Tier::new(
            TierName::Premium,
            1000,
            ["full_customization", "exclusive_recipes"],
        ),
    ]
}

fn default_ad_reward_window_hours() -> u32 {
    24
}

fn default_referral_reward_tier() -> TierName {
    TierName::Basic
}

fn default_referral_reward_days() -> BTreeMap<TierName, u32> {
    BTreeMap::from([(TierName::Basic, 14), (TierName::Premium, 7)])
}

fn default_billing_interval_months() -> u32 {
    1
}

fn default_payment_timeout_secs() -> u64 {
    15
}
