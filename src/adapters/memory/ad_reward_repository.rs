//! In-memory ad reward repository.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::monetization::AdReward;
use crate::ports::AdRewardRepository;

/// Append-only reward log keyed by user.
#[derive(Debug, Default)]
pub struct InMemoryAdRewardRepository {
    rewards: DashMap<UserId, Vec<AdReward>>,
}

impl InMemoryAdRewardRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AdRewardRepository for InMemoryAdRewardRepository {
    async fn insert(&self, reward: &AdReward) -> Result<(), DomainError> {
        self.rewards
            .entry(reward.user_id.clone())
            .or_default()
            .push(reward.clone());
        Ok(())
    }

    async fn list_active(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Vec<AdReward>, DomainError> {
        let mut active: Vec<AdReward> = self
            .rewards
            .get(user_id)
            .map(|rewards| {
                rewards
                    .iter()
                    .filter(|r| r.is_active_at(now))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        active.sort_by_key(|r| r.granted_at);
        Ok(active)
    }

    async fn list_all(&self, user_id: &UserId) -> Result<Vec<AdReward>, DomainError> {
        let mut all = self
            .rewards
            .get(user_id)
            .map(|rewards| rewards.value().clone())
            .unwrap_or_default();
        all.sort_by_key(|r| r.granted_at);
        Ok(all)
    }
}
