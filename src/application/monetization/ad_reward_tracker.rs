//! AdRewardTracker - grants time-boxed rewards for watched ads.

use std::sync::Arc;

use crate::config::MonetizationConfig;
use crate::domain::foundation::UserId;
use crate::domain::monetization::{ActiveRewards, AdReward, MonetizationError};
use crate::ports::{AdRewardRepository, Clock};

pub struct AdRewardTracker {
    rewards: Arc<dyn AdRewardRepository>,
    clock: Arc<dyn Clock>,
    window: chrono::Duration,
}

impl AdRewardTracker {
    pub fn new(
        config: &MonetizationConfig,
        rewards: Arc<dyn AdRewardRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            rewards,
            clock,
            window: config.ad_reward_window(),
        }
    }

    /// Records a reward expiring one window from now.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` for an empty or over-long `ad_type`.
    pub async fn grant_reward(
        &self,
        user_id: &UserId,
        ad_type: &str,
    ) -> Result<AdReward, MonetizationError> {
        let reward = AdReward::grant(user_id.clone(), ad_type, self.window, self.clock.now())?;
        self.rewards.insert(&reward).await?;

        tracing::info!(
            user_id = %user_id,
            reward_id = %reward.id,
            ad_type = %reward.ad_type,
            expires_at = %reward.expires_at,
            "Ad reward granted"
        );
        Ok(reward)
    }

    /// Non-expired rewards at the current instant, oldest first.
    pub async fn active_rewards(&self, user_id: &UserId) -> Result<ActiveRewards, MonetizationError> {
        let now = self.clock.now();
        let rewards = self.rewards.list_active(user_id, now).await?;
        tracing::debug!(user_id = %user_id, count = rewards.len(), "Active ad rewards loaded");
        Ok(ActiveRewards::new(rewards, now))
    }

    /// Every reward ever granted to the user, oldest first.
    pub async fn reward_history(&self, user_id: &UserId) -> Result<Vec<AdReward>, MonetizationError> {
        Ok(self.rewards.list_all(user_id).await?)
    }
}
