//! Ad reward entity and the active-reward view.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{AdRewardId, Timestamp, UserId, ValidationError};

/// Longest accepted ad tag.
const MAX_AD_TYPE_LEN: usize = 50;

/// Time-boxed grant for watching an advertisement.
///
/// Read-only after creation and kept after expiry for analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdReward {
    pub id: AdRewardId,
    pub user_id: UserId,

    /// Free-form category, e.g. `recipe` or `meal_plan`.
    pub ad_type: String,

    pub granted_at: Timestamp,
    pub expires_at: Timestamp,
}

impl AdReward {
    /// Creates a reward valid for `window` from `now`.
    pub fn grant(
        user_id: UserId,
        ad_type: impl Into<String>,
        window: Duration,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        let ad_type = ad_type.into();
        let trimmed = ad_type.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::empty_field("ad_type"));
        }
        if trimmed.chars().count() > MAX_AD_TYPE_LEN {
            return Err(ValidationError::invalid_format(
                "ad_type",
                format!("must be at most {} characters", MAX_AD_TYPE_LEN),
            ));
        }

        Ok(Self {
            id: AdRewardId::new(),
            user_id,
            ad_type: trimmed.to_string(),
            granted_at: now,
            expires_at: now.plus(window),
        })
    }

    /// A reward is active strictly before its expiry instant.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        now < self.expires_at
    }
}

/// Snapshot of a user's rewards evaluated against a fixed instant.
///
/// Iteration is lazy and can be restarted: every call to [`ActiveRewards::iter`]
/// walks the snapshot again, yielding non-expired rewards oldest first.
#[derive(Debug, Clone)]
pub struct ActiveRewards {
    rewards: Vec<AdReward>,
    as_of: Timestamp,
}

impl ActiveRewards {
    /// Builds the view; input order does not matter.
    pub fn new(mut rewards: Vec<AdReward>, as_of: Timestamp) -> Self {
        rewards.sort_by_key(|r| (r.granted_at, *r.id.as_uuid()));
        Self { rewards, as_of }
    }

    /// Instant the view was evaluated at.
    pub fn as_of(&self) -> Timestamp {
        self.as_of
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdReward> + '_ {
        let as_of = self.as_of;
        self.rewards.iter().filter(move |r| r.is_active_at(as_of))
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Returns true if an active reward of this category exists.
    pub fn contains_type(&self, ad_type: &str) -> bool {
        self.iter().any(|r| r.ad_type == ad_type)
    }
}

impl<'a> IntoIterator for &'a ActiveRewards {
    type Item = &'a AdReward;
    type IntoIter = Box<dyn Iterator<Item = &'a AdReward> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
