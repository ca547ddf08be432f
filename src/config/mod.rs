//! Application configuration module
//!
//! Type-safe configuration loaded from environment variables using the
//! `config` and `dotenvy` crates. Variables use the `FLAVORAPP` prefix and
//! `__` between nesting levels.
//!
//! # Example
//!
//! ```no_run
//! use flavorapp::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//! ```

mod database;
mod error;
mod identity;
mod logging;
mod monetization;
mod payment;

pub use database::DatabaseConfig;
pub use error::{ConfigError, ValidationError};
pub use identity::IdentityConfig;
pub use logging::LoggingConfig;
pub use monetization::MonetizationConfig;
pub use payment::PaymentConfig;

use serde::Deserialize;

/// Root application configuration
///
/// Load using [`AppConfig::load()`] which reads from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Payment processor configuration (Stripe)
    pub payment: PaymentConfig,

    /// PostgreSQL; in-memory stores are used when absent
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Tier catalog and reward policy
    #[serde(default)]
    pub monetization: MonetizationConfig,

    /// Users served by the in-memory identity provider
    #[serde(default)]
    pub identity: IdentityConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `FLAVORAPP` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    ///
    /// # Environment Variable Format
    ///
    /// - `FLAVORAPP__PAYMENT__STRIPE_API_KEY=sk_test_...` -> `payment.stripe_api_key`
    /// - `FLAVORAPP__MONETIZATION__AD_REWARD_WINDOW_HOURS=12` -> `monetization.ad_reward_window_hours`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or values
    /// cannot be parsed into the expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("FLAVORAPP")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.payment.validate()?;
        if let Some(database) = &self.database {
            database.validate()?;
        }
        self.logging.validate()?;
        self.monetization.validate()?;
        self.identity.validate()?;
        Ok(())
    }
}
