//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Invalid timeout: {0} must be greater than zero")]
    InvalidTimeout(&'static str),

    #[error("Invalid database URL format")]
    InvalidDatabaseUrl,

    #[error("Pool min_connections exceeds max_connections")]
    InvalidPoolSize,

    #[error("Pool size exceeds maximum allowed (100)")]
    PoolSizeTooLarge,

    #[error("Invalid Stripe API key format")]
    InvalidStripeKey,

    #[error("Invalid Stripe API base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),

    #[error("Invalid tier catalog: {0}")]
    InvalidCatalog(String),

    #[error("Ad reward window must be between 1 and {max} hours, got {actual}")]
    InvalidAdRewardWindow { max: u32, actual: u32 },

    #[error("Referral reward tier '{0}' is not in the tier catalog")]
    UnknownReferralRewardTier(String),

    #[error("No referral reward days configured for tier '{0}'")]
    MissingReferralDays(String),

    #[error("Billing interval must be between 1 and 12 months, got {0}")]
    InvalidBillingInterval(u32),

    #[error("Invalid identity user id: '{0}'")]
    InvalidIdentityUser(String),

    #[error("Invalid email address for user '{0}'")]
    InvalidUserEmail(String),
}
