//! In-memory subscription repository.
//!
//! Each user's records live in one `DashMap` entry; every operation runs
//! under that entry's shard lock, which makes replace/extend/close atomic per
//! user without a store-wide lock.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::domain::foundation::{DomainError, SubscriptionId, Timestamp, UserId};
use crate::domain::monetization::Subscription;
use crate::ports::{Replacement, SubscriptionRepository};

/// Subscription arena keyed by user, for tests and single-node deployments.
#[derive(Debug, Default)]
pub struct InMemorySubscriptionRepository {
    records: DashMap<UserId, Vec<Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active records for a user. Test helper for the
    /// one-active-per-user invariant.
    pub fn active_count(&self, user_id: &UserId) -> usize {
        self.records
            .get(user_id)
            .map(|records| records.iter().filter(|s| s.active).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn replace_active(&self, subscription: &Subscription) -> Result<Replacement, DomainError> {
        let now = subscription.start;
        let mut current = subscription.clone();
        let mut records = self
            .records
            .entry(subscription.user_id.clone())
            .or_default();

        let mut superseded = None;
        for record in records.iter_mut().filter(|s| s.active) {
            current.inherit_credit(record, now);
            record.deactivate(now);
            superseded = Some(record.clone());
        }
        records.push(current.clone());

        Ok(Replacement {
            current,
            superseded,
        })
    }

    async fn current(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        Ok(self
            .records
            .get(user_id)
            .and_then(|records| records.last().cloned()))
    }

    async fn history(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        Ok(self
            .records
            .get(user_id)
            .map(|records| records.value().clone())
            .unwrap_or_default())
    }

    async fn deactivate_current(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        let Some(mut records) = self.records.get_mut(user_id) else {
            return Ok(None);
        };
        Ok(records.last_mut().map(|current| {
            current.deactivate(now);
            current.clone()
        }))
    }

    async fn extend_active(
        &self,
        user_id: &UserId,
        days: u32,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        let Some(mut records) = self.records.get_mut(user_id) else {
            return Ok(None);
        };
        Ok(records.iter_mut().find(|s| s.active).map(|active| {
            active.extend_validity(days, now);
            active.clone()
        }))
    }

    async fn close_active(
        &self,
        user_id: &UserId,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        let Some(mut records) = self.records.get_mut(user_id) else {
            return Ok(None);
        };
        Ok(records.iter_mut().find(|s| s.active && s.id == *id).map(|active| {
            active.close_at_credit_end(now);
            active.clone()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monetization::TierName;

    fn user() -> UserId {
        UserId::new("u1").unwrap()
    }

    fn now() -> Timestamp {
        Timestamp::parse_rfc3339("2025-03-01T12:00:00Z").unwrap()
    }

    fn sub(tier: TierName, at: Timestamp) -> Subscription {
        Subscription::activate(user(), tier, None, at)
    }

    #[tokio::test]
    async fn replace_supersedes_previous_active() {
        let repo = InMemorySubscriptionRepository::new();
        let first = sub(TierName::Basic, now());
        let second = sub(TierName::Premium, now().add_days(1));

        assert_eq!(repo.replace_active(&first).await.unwrap().superseded, None);
        let superseded = repo.replace_active(&second).await.unwrap().superseded.unwrap();

        assert_eq!(superseded.id, first.id);
        assert!(!superseded.active);
        assert_eq!(repo.active_count(&user()), 1);
        assert_eq!(repo.current(&user()).await.unwrap().unwrap().id, second.id);
        assert_eq!(repo.history(&user()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn deactivate_without_record_returns_none() {
        let repo = InMemorySubscriptionRepository::new();
        assert_eq!(repo.deactivate_current(&user(), now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn replace_carries_banked_credit_to_new_record() {
        let repo = InMemorySubscriptionRepository::new();
        repo.replace_active(&sub(TierName::Basic, now())).await.unwrap();
        repo.extend_active(&user(), 14, now()).await.unwrap();

        let upgrade = sub(TierName::Premium, now().add_days(2));
        let replacement = repo.replace_active(&upgrade).await.unwrap();

        assert_eq!(replacement.current.id, upgrade.id);
        assert_eq!(replacement.current.banked_credit_days, 14);
        assert_eq!(
            repo.current(&user()).await.unwrap().unwrap().banked_credit_days,
            14
        );
    }

    #[tokio::test]
    async fn extend_updates_active_record() {
        let repo = InMemorySubscriptionRepository::new();
        repo.replace_active(&sub(TierName::Basic, now())).await.unwrap();

        let updated = repo.extend_active(&user(), 14, now()).await.unwrap().unwrap();
        assert_eq!(updated.banked_credit_days, 14);
        assert_eq!(
            repo.current(&user()).await.unwrap().unwrap().banked_credit_days,
            14
        );
    }

    #[tokio::test]
    async fn extend_skips_inactive_records() {
        let repo = InMemorySubscriptionRepository::new();
        repo.replace_active(&sub(TierName::Basic, now())).await.unwrap();
        repo.deactivate_current(&user(), now()).await.unwrap();

        assert_eq!(repo.extend_active(&user(), 14, now()).await.unwrap(), None);
        assert_eq!(
            repo.current(&user()).await.unwrap().unwrap().banked_credit_days,
            0
        );
    }

    #[tokio::test]
    async fn close_ignores_inactive_records() {
        let repo = InMemorySubscriptionRepository::new();
        let first = sub(TierName::Basic, now());
        repo.replace_active(&first).await.unwrap();
        repo.deactivate_current(&user(), now()).await.unwrap();

        assert_eq!(repo.close_active(&user(), &first.id, now()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn close_leaves_a_newer_active_record_alone() {
        let repo = InMemorySubscriptionRepository::new();
        let first = sub(TierName::Basic, now());
        let second = sub(TierName::Premium, now().add_days(1));
        repo.replace_active(&first).await.unwrap();
        repo.replace_active(&second).await.unwrap();

        let closed = repo.close_active(&user(), &first.id, now()).await.unwrap();

        assert_eq!(closed, None);
        let current = repo.current(&user()).await.unwrap().unwrap();
        assert_eq!(current.id, second.id);
        assert!(current.end.is_none());
    }
}
