//! Stripe REST API response types.
//!
//! Only the fields the gateway reads are modelled; Stripe sends many more and
//! serde ignores them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stripe Customer object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeCustomer {
    /// Unique customer identifier (cus_...).
    pub id: String,

    pub email: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe Subscription object.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripeSubscription {
    /// Unique subscription identifier (sub_...).
    pub id: String,

    /// Customer ID owning this subscription.
    pub customer: String,

    /// `active`, `incomplete`, `canceled`, ...
    pub status: String,

    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Error envelope returned with every non-2xx response.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeErrorEnvelope {
    pub error: StripeApiError,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeApiError {
    /// `card_error`, `invalid_request_error`, `api_error`, ...
    #[serde(rename = "type")]
    pub kind: Option<String>,

    pub code: Option<String>,

    /// Issuer reason on card errors, e.g. `insufficient_funds`.
    pub decline_code: Option<String>,

    pub message: Option<String>,
}

impl StripeApiError {
    /// Most specific provider code available.
    pub fn provider_code(&self) -> Option<&str> {
        self.decline_code.as_deref().or(self.code.as_deref())
    }
}
