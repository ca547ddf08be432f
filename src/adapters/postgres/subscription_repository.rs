//! PostgreSQL implementation of SubscriptionRepository.
//!
//! Writes that touch a user's records run in one transaction that first takes
//! a per-user advisory lock, so the lock also covers users with no rows yet.
//! The partial unique index `subscriptions_one_active_per_user` backs the
//! one-active invariant at the storage level.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{db_error, parse_user_id};
use crate::domain::foundation::{DomainError, ErrorCode, SubscriptionId, Timestamp, UserId};
use crate::domain::monetization::{Subscription, TierName};
use crate::ports::{Replacement, SubscriptionRepository};

/// PostgreSQL implementation of the SubscriptionRepository port.
pub struct PostgresSubscriptionRepository {
    pool: PgPool,
}

impl PostgresSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Locks the user's rows, applies `mutate` to the record chosen by
    /// `target` and writes it back.
    async fn update_locked<F>(
        &self,
        user_id: &UserId,
        target: Target,
        mutate: F,
    ) -> Result<Option<Subscription>, DomainError>
    where
        F: FnOnce(&mut Subscription) + Send,
    {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;
        lock_user(&mut tx, user_id).await?;

        let query = match target {
            Target::Current => {
                sqlx::query_as::<_, SubscriptionRow>(SELECT_CURRENT_FOR_UPDATE)
                    .bind(user_id.as_str())
            }
            Target::Active => {
                sqlx::query_as::<_, SubscriptionRow>(SELECT_ACTIVE_FOR_UPDATE)
                    .bind(user_id.as_str())
            }
            Target::ActiveWithId(id) => {
                sqlx::query_as::<_, SubscriptionRow>(SELECT_ACTIVE_BY_ID_FOR_UPDATE)
                    .bind(user_id.as_str())
                    .bind(*id.as_uuid())
            }
        };
        let row = query
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| db_error("Failed to load subscription", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut subscription = Subscription::try_from(row)?;
        mutate(&mut subscription);

        sqlx::query(
            r#"
            UPDATE subscriptions SET
                end_at = $2,
                active = $3,
                banked_credit_days = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.end.map(|t| *t.as_datetime()))
        .bind(subscription.active)
        .bind(banked_days_to_column(subscription.banked_credit_days)?)
        .bind(subscription.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to update subscription", e))?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit subscription update", e))?;

        Ok(Some(subscription))
    }
}

/// Which of a user's records a locked update applies to.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// The most recent record, active or not.
    Current,
    Active,
    /// The active record, only if it is still `id`.
    ActiveWithId(SubscriptionId),
}

/// Database row representation of a subscription.
#[derive(Debug, sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    user_id: String,
    tier: Option<String>,
    start_at: DateTime<Utc>,
    end_at: Option<DateTime<Utc>>,
    active: bool,
    external_id: Option<String>,
    banked_credit_days: i32,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRow> for Subscription {
    type Error = DomainError;

    fn try_from(row: SubscriptionRow) -> Result<Self, Self::Error> {
        let banked_credit_days = u32::try_from(row.banked_credit_days).map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid banked_credit_days value: {}", row.banked_credit_days),
            )
        })?;

        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.id),
            user_id: parse_user_id("user_id", row.user_id)?,
            tier: row.tier.as_deref().and_then(parse_tier),
            start: Timestamp::from_datetime(row.start_at),
            end: row.end_at.map(Timestamp::from_datetime),
            active: row.active,
            external_id: row.external_id,
            banked_credit_days,
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

/// Unknown tier names load as `None`; the record is then suspended.
fn parse_tier(s: &str) -> Option<TierName> {
    s.parse().ok()
}

fn banked_days_to_column(days: u32) -> Result<i32, DomainError> {
    i32::try_from(days).map_err(|_| {
        DomainError::new(
            ErrorCode::ValidationFailed,
            format!("banked_credit_days out of range: {}", days),
        )
    })
}

async fn lock_user(tx: &mut Transaction<'_, Postgres>, user_id: &UserId) -> Result<(), DomainError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
        .bind(user_id.as_str())
        .execute(&mut **tx)
        .await
        .map_err(|e| db_error("Failed to lock user subscriptions", e))?;
    Ok(())
}

const SELECT_CURRENT_FOR_UPDATE: &str = r#"
    SELECT id, user_id, tier, start_at, end_at, active, external_id,
           banked_credit_days, updated_at
    FROM subscriptions
    WHERE user_id = $1
    ORDER BY seq DESC
    LIMIT 1
    FOR UPDATE
"#;

const SELECT_ACTIVE_FOR_UPDATE: &str = r#"
    SELECT id, user_id, tier, start_at, end_at, active, external_id,
           banked_credit_days, updated_at
    FROM subscriptions
    WHERE user_id = $1 AND active
    FOR UPDATE
"#;

const SELECT_ACTIVE_BY_ID_FOR_UPDATE: &str = r#"
    SELECT id, user_id, tier, start_at, end_at, active, external_id,
           banked_credit_days, updated_at
    FROM subscriptions
    WHERE user_id = $1 AND id = $2 AND active
    FOR UPDATE
"#;

#[async_trait]
impl SubscriptionRepository for PostgresSubscriptionRepository {
    async fn replace_active(&self, subscription: &Subscription) -> Result<Replacement, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| db_error("Failed to begin transaction", e))?;
        lock_user(&mut tx, &subscription.user_id).await?;

        let superseded = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            UPDATE subscriptions SET active = FALSE, updated_at = $2
            WHERE user_id = $1 AND active
            RETURNING id, user_id, tier, start_at, end_at, active, external_id,
                      banked_credit_days, updated_at
            "#,
        )
        .bind(subscription.user_id.as_str())
        .bind(subscription.start.as_datetime())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| db_error("Failed to supersede active subscription", e))?
        .map(Subscription::try_from)
        .transpose()?;

        let mut current = subscription.clone();
        if let Some(old) = &superseded {
            current.inherit_credit(old, subscription.start);
        }

        sqlx::query(
            r#"
            INSERT INTO subscriptions (
                id, user_id, tier, start_at, end_at, active, external_id,
                banked_credit_days, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(current.id.as_uuid())
        .bind(current.user_id.as_str())
        .bind(current.tier.map(|t| t.as_str()))
        .bind(current.start.as_datetime())
        .bind(current.end.map(|t| *t.as_datetime()))
        .bind(current.active)
        .bind(&current.external_id)
        .bind(banked_days_to_column(current.banked_credit_days)?)
        .bind(current.updated_at.as_datetime())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.constraint() == Some("subscriptions_one_active_per_user") {
                    return DomainError::new(
                        ErrorCode::ConcurrencyConflict,
                        "User already has an active subscription",
                    );
                }
            }
            db_error("Failed to save subscription", e)
        })?;

        tx.commit()
            .await
            .map_err(|e| db_error("Failed to commit subscription", e))?;

        Ok(Replacement {
            current,
            superseded,
        })
    }

    async fn current(&self, user_id: &UserId) -> Result<Option<Subscription>, DomainError> {
        let row = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, tier, start_at, end_at, active, external_id,
                   banked_credit_days, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY seq DESC
            LIMIT 1
            "#,
        )
        .bind(user_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("Failed to find subscription", e))?;

        row.map(Subscription::try_from).transpose()
    }

    async fn history(&self, user_id: &UserId) -> Result<Vec<Subscription>, DomainError> {
        let rows = sqlx::query_as::<_, SubscriptionRow>(
            r#"
            SELECT id, user_id, tier, start_at, end_at, active, external_id,
                   banked_credit_days, updated_at
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(user_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("Failed to list subscriptions", e))?;

        rows.into_iter().map(Subscription::try_from).collect()
    }

    async fn deactivate_current(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        self.update_locked(user_id, Target::Current, move |s| {
            s.deactivate(now);
        })
        .await
    }

    async fn extend_active(
        &self,
        user_id: &UserId,
        days: u32,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        self.update_locked(user_id, Target::Active, move |s| {
            s.extend_validity(days, now)
        })
        .await
    }

    async fn close_active(
        &self,
        user_id: &UserId,
        id: &SubscriptionId,
        now: Timestamp,
    ) -> Result<Option<Subscription>, DomainError> {
        self.update_locked(user_id, Target::ActiveWithId(*id), move |s| {
            s.close_at_credit_end(now)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> SubscriptionRow {
        let now = Utc::now();
        SubscriptionRow {
            id: Uuid::new_v4(),
            user_id: "u1".to_string(),
            tier: Some("basic".to_string()),
            start_at: now,
            end_at: None,
            active: true,
            external_id: Some("sub_123".to_string()),
            banked_credit_days: 14,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_subscription() {
        let sub = Subscription::try_from(row()).unwrap();
        assert_eq!(sub.tier, Some(TierName::Basic));
        assert_eq!(sub.banked_credit_days, 14);
        assert_eq!(sub.user_id.as_str(), "u1");
        assert!(sub.end.is_none());
    }

    #[test]
    fn unknown_tier_loads_as_suspended() {
        let mut r = row();
        r.tier = Some("gold".to_string());
        assert_eq!(Subscription::try_from(r).unwrap().tier, None);
    }

    #[test]
    fn negative_banked_days_is_rejected() {
        let mut r = row();
        r.banked_credit_days = -1;
        let err = Subscription::try_from(r).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }

    #[test]
    fn banked_days_column_range() {
        assert_eq!(banked_days_to_column(21).unwrap(), 21);
        assert!(banked_days_to_column(u32::MAX).is_err());
    }
}
