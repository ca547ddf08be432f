//! Ad reward repository port.
//!
//! Rewards are append-only; expiry is evaluated at read time.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::domain::monetization::AdReward;

/// Repository port for AdReward records.
#[async_trait]
pub trait AdRewardRepository: Send + Sync {
    /// Stores a newly granted reward.
    async fn insert(&self, reward: &AdReward) -> Result<(), DomainError>;

    /// Rewards with `expires_at > now`, ordered by `granted_at` ascending.
    async fn list_active(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Vec<AdReward>, DomainError>;

    /// Every reward of the user including expired ones, oldest first.
    async fn list_all(&self, user_id: &UserId) -> Result<Vec<AdReward>, DomainError>;
}
