//! PostgreSQL implementation of AdRewardRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{db_error, parse_user_id};
use crate::domain::foundation::{AdRewardId, DomainError, Timestamp, UserId};
use crate::domain::monetization::AdReward;
use crate::ports::AdRewardRepository;

pub struct PostgresAdRewardRepository {
    pool: PgPool,
}

impl PostgresAdRewardRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AdRewardRow {
    id: Uuid,
    user_id: String,
    ad_type: String,
    granted_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<AdRewardRow> for AdReward {
    type Error = DomainError;

    fn try_from(row: AdRewardRow) -> Result<Self, Self::Error> {
        Ok(AdReward {
            id: AdRewardId::from_uuid(row.id),
            user_id: parse_user_id("user_id", row.user_id)?,
            ad_type: row.ad_type,
            granted_at: Timestamp::from_datetime(row.granted_at),
            expires_at: Timestamp::from_datetime(row.expires_at),
        })
    }
}

#[async_trait]
impl AdRewardRepository for PostgresAdRewardRepository {
    async fn insert(&self, reward: &AdReward) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO ad_rewards (id, user_id, ad_type, granted_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(reward.id.as_uuid())
        .bind(reward.user_id.as_str())
        .bind(&reward.ad_type)
        .bind(reward.granted_at.as_datetime())
        .bind(reward.expires_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("Failed to save ad reward", e))?;

        Ok(())
    }

    async fn list_active(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Vec<AdReward>, DomainError> {
        let rows = sqlx::query_as::<_, AdRewardRow>(
            r#"
            SELECT id, user_id, ad_type, granted_at, expires_at
            FROM ad_rewards
            WHERE user_id = $1 AND expires_at > $2
            ORDER BY granted_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list active ad rewards", e))?;

        rows.into_iter().map(AdReward::try_from).collect()
    }

    async fn list_all(&self, user_id: &UserId) -> Result<Vec<AdReward>, DomainError> {
        let rows = sqlx::query_as::<_, AdRewardRow>(
            r#"
            SELECT id, user_id, ad_type, granted_at, expires_at
            FROM ad_rewards
            WHERE user_id = $1
            ORDER BY granted_at ASC, id ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list ad rewards", e))?;

        rows.into_iter().map(AdReward::try_from).collect()
    }
}
