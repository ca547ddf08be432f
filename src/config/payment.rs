//! Payment configuration

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Payment processor configuration (Stripe)
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...)
    pub stripe_api_key: SecretString,

    /// Stripe API base URL, overridable for tests
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// HTTP timeout for a single Stripe request, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl PaymentConfig {
    pub fn new(stripe_api_key: impl Into<String>) -> Self {
        Self {
            stripe_api_key: SecretString::new(stripe_api_key.into()),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    /// Check if using Stripe test mode
    pub fn is_test_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_test_")
    }

    /// Check if using Stripe live mode
    pub fn is_live_mode(&self) -> bool {
        self.stripe_api_key.expose_secret().starts_with("sk_live_")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Validate payment configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        let key = self.stripe_api_key.expose_secret();
        if key.is_empty() {
            return Err(ValidationError::MissingRequired(
                "FLAVORAPP__PAYMENT__STRIPE_API_KEY",
            ));
        }
        // Secret keys only; publishable keys (pk_) cannot create subscriptions.
        if !key.starts_with("sk_") {
            return Err(ValidationError::InvalidStripeKey);
        }
        if !self.api_base_url.starts_with("https://") && !self.api_base_url.starts_with("http://") {
            return Err(ValidationError::InvalidBaseUrl(self.api_base_url.clone()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout("payment.request_timeout_secs"));
        }
        Ok(())
    }
}

fn default_api_base_url() -> String {
    "https://api.stripe.com".to_string()
}

fn default_request_timeout() -> u64 {
    10
}
