//! PostgreSQL implementation of ReferralRepository.
//!
//! Pair uniqueness comes from the `referrals_pair_key` index via
//! `ON CONFLICT DO NOTHING`; the reward claim is a conditional update on
//! `rewarded = FALSE`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, parse_user_id};
use crate::domain::foundation::{DomainError, ReferralId, Timestamp, UserId};
use crate::domain::monetization::Referral;
use crate::ports::{ReferralInsert, ReferralRepository, RewardClaim};

pub struct PostgresReferralRepository {
    pool: PgPool,
}

impl PostgresReferralRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ReferralRow {
    id: Uuid,
    referrer: String,
    referred: String,
    reward_tier: Option<String>,
    created_at: DateTime<Utc>,
    rewarded: bool,
    rewarded_at: Option<DateTime<Utc>>,
}

impl TryFrom<ReferralRow> for Referral {
    type Error = DomainError;

    fn try_from(row: ReferralRow) -> Result<Self, Self::Error> {
        Ok(Referral {
            id: ReferralId::from_uuid(row.id),
            referrer: parse_user_id("referrer", row.referrer)?,
            referred: parse_user_id("referred", row.referred)?,
            reward_tier: row.reward_tier.as_deref().and_then(|t| t.parse().ok()),
            created_at: Timestamp::from_datetime(row.created_at),
            rewarded: row.rewarded,
            rewarded_at: row.rewarded_at.map(Timestamp::from_datetime),
        })
    }
}

#[async_trait]
impl ReferralRepository for PostgresReferralRepository {
    async fn insert_if_absent(&self, referral: &Referral) -> Result<ReferralInsert, DomainError> {
        let result = sqlx::query(
            r#"
            INSERT INTO referrals (
                id, referrer, referred, reward_tier, created_at, rewarded, rewarded_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (referrer, referred) DO NOTHING
            "#,
        )
        .bind(referral.id.as_uuid())
        .bind(referral.referrer.as_str())
        .bind(referral.referred.as_str())
        .bind(referral.reward_tier.map(|t| t.as_str()))
        .bind(referral.created_at.as_datetime())
        .bind(referral.rewarded)
        .bind(referral.rewarded_at.map(|t| *t.as_datetime()))
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save referral", e))?;

        if result.rows_affected() == 1 {
            return Ok(ReferralInsert::Inserted);
        }

        let existing = self
            .find_by_pair(&referral.referrer, &referral.referred)
            .await?
            .ok_or_else(|| {
                DomainError::database("Referral insert conflicted but no existing pair was found")
            })?;
        Ok(ReferralInsert::Duplicate(existing))
    }

    async fn find(&self, id: &ReferralId) -> Result<Option<Referral>, DomainError> {
        let row = sqlx::query_as::<_, ReferralRow>(
            r#"
            SELECT id, referrer, referred, reward_tier, created_at, rewarded, rewarded_at
            FROM referrals
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find referral", e))?;

        row.map(Referral::try_from).transpose()
    }

    async fn find_by_pair(
        &self,
        referrer: &UserId,
        referred: &UserId,
    ) -> Result<Option<Referral>, DomainError> {
        let row = sqlx::query_as::<_, ReferralRow>(
            r#"
            SELECT id, referrer, referred, reward_tier, created_at, rewarded, rewarded_at
            FROM referrals
            WHERE referrer = $1 AND referred = $2
            "#,
        )
        .bind(referrer.as_str())
        .bind(referred.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find referral", e))?;

        row.map(Referral::try_from).transpose()
    }

    async fn claim_reward(
        &self,
        id: &ReferralId,
        now: Timestamp,
    ) -> Result<RewardClaim, DomainError> {
        let claimed = sqlx::query_as::<_, ReferralRow>(
            r#"
            UPDATE referrals SET rewarded = TRUE, rewarded_at = $2
            WHERE id = $1 AND rewarded = FALSE
            RETURNING id, referrer, referred, reward_tier, created_at, rewarded, rewarded_at
            "#,
        )
        .bind(id.as_uuid())
        .bind(now.as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to claim referral reward", e))?;

        if let Some(row) = claimed {
            return Ok(RewardClaim::Claimed(Referral::try_from(row)?));
        }

        Ok(match self.find(id).await? {
            Some(existing) => RewardClaim::AlreadyRewarded(existing),
            None => RewardClaim::Missing,
        })
    }

    async fn release_reward(&self, id: &ReferralId) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            UPDATE referrals SET rewarded = FALSE, rewarded_at = NULL
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to release referral reward", e))?;

        Ok(())
    }

    async fn list_by_referrer(&self, referrer: &UserId) -> Result<Vec<Referral>, DomainError> {
        let rows = sqlx::query_as::<_, ReferralRow>(
            r#"
            SELECT id, referrer, referred, reward_tier, created_at, rewarded, rewarded_at
            FROM referrals
            WHERE referrer = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(referrer.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list referrals", e))?;

        rows.into_iter().map(Referral::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::monetization::TierName;

    fn row() -> ReferralRow {
        ReferralRow {
            id: Uuid::new_v4(),
            referrer: "u1".to_string(),
            referred: "u2".to_string(),
            reward_tier: Some("basic".to_string()),
            created_at: Utc::now(),
            rewarded: false,
            rewarded_at: None,
        }
    }

    #[test]
    fn row_converts_to_referral() {
        let referral = Referral::try_from(row()).unwrap();
        assert_eq!(referral.referrer.as_str(), "u1");
        assert_eq!(referral.reward_tier, Some(TierName::Basic));
        assert!(!referral.rewarded);
    }

    #[test]
    fn removed_reward_tier_loads_as_none() {
        let mut r = row();
        r.reward_tier = Some("legacy".to_string());
        assert_eq!(Referral::try_from(r).unwrap().reward_tier, None);
    }
}
