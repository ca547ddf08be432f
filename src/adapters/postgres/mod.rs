//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresSubscriptionRepository` - subscription arena with a partial
//!   unique index enforcing one active record per user
//! - `PostgresAdRewardRepository` - append-only ad reward log
//! - `PostgresReferralRepository` - referrals with a unique pair index and a
//!   conditional-update reward claim
//!
//! Schema lives in `migrations/` and is applied by [`run_migrations`].

mod ad_reward_repository;
mod referral_repository;
mod subscription_repository;

pub use ad_reward_repository::PostgresAdRewardRepository;
pub use referral_repository::PostgresReferralRepository;
pub use subscription_repository::PostgresSubscriptionRepository;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;
use crate::domain::foundation::{DomainError, ErrorCode, UserId};

/// Opens a connection pool sized and timed from configuration.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .idle_timeout(config.idle_timeout())
        .max_lifetime(config.max_lifetime())
        .connect(&config.url)
        .await
}

/// Applies the embedded migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

fn db_error(context: &str, e: sqlx::Error) -> DomainError {
    DomainError::new(ErrorCode::DatabaseError, format!("{}: {}", context, e))
}

fn parse_user_id(column: &str, raw: String) -> Result<UserId, DomainError> {
    UserId::new(raw).map_err(|e| {
        DomainError::new(
            ErrorCode::DatabaseError,
            format!("Invalid {} value: {}", column, e),
        )
    })
}
