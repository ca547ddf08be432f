//! Payment gateway port for external billing.
//!
//! Defines the contract for payment processor integrations (e.g., Stripe).
//! The core only ever asks for a recurring charge of a given price and
//! interval, and for its cancellation.
//!
//! # Design
//!
//! - **Gateway agnostic**: no provider-specific payloads cross this boundary
//! - **Typed failures**: every error carries a code and a retry hint
//! - **Idempotent**: requests carry a key so the processor can dedupe retries

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::foundation::{DomainError, UserId};

/// Port for payment processor integrations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Start a recurring billing subscription.
    ///
    /// Returns the processor's subscription id.
    async fn create_billing_subscription(
        &self,
        request: BillingRequest,
    ) -> Result<ExternalSubscriptionId, PaymentError>;

    /// Stop a recurring billing subscription immediately.
    async fn cancel_billing_subscription(
        &self,
        subscription_id: &ExternalSubscriptionId,
    ) -> Result<(), PaymentError>;
}

/// Request to start recurring billing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingRequest {
    /// Internal user ID (stored as metadata).
    pub user_id: UserId,

    /// Customer email address.
    pub user_email: String,

    /// Name shown on the processor's invoice, e.g. `Basic - $5/month`.
    pub product_name: String,

    /// Amount charged each interval, in cents.
    pub price_cents: i64,

    /// Billing interval length in months.
    pub interval_months: u32,

    /// Idempotency key for safe retries.
    pub idempotency_key: Option<String>,
}

/// Processor-side identifier of a billing subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalSubscriptionId(String);

impl ExternalSubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ExternalSubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors from payment gateway operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentError {
    /// Error code for categorization.
    pub code: PaymentErrorCode,

    /// Human-readable message.
    pub message: String,

    /// Provider's error code (if available).
    pub provider_code: Option<String>,

    /// Whether the operation can be retried.
    pub retryable: bool,
}

impl PaymentError {
    /// Create a new payment error.
    pub fn new(code: PaymentErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            provider_code: None,
            retryable: code.is_retryable(),
        }
    }

    /// Attach the provider's own error code.
    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::NetworkError, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::Timeout, message)
    }

    pub fn card_declined(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::CardDeclined, message)
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new(PaymentErrorCode::NotFound, format!("{} not found", resource))
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::new(PaymentErrorCode::ProviderError, message)
    }
}

impl fmt::Display for PaymentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for PaymentError {}

impl From<PaymentError> for DomainError {
    fn from(err: PaymentError) -> Self {
        use crate::domain::foundation::ErrorCode;

        let code = match err.code {
            PaymentErrorCode::Timeout => ErrorCode::Timeout,
            PaymentErrorCode::CardDeclined
            | PaymentErrorCode::InsufficientFunds
            | PaymentErrorCode::InvalidCard => ErrorCode::PaymentFailed,
            PaymentErrorCode::NotFound => ErrorCode::NotFound,
            _ => ErrorCode::ExternalServiceError,
        };

        DomainError::new(code, err.message)
    }
}

/// Payment error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentErrorCode {
    /// Network connectivity issue.
    NetworkError,

    /// No answer within the configured bound.
    Timeout,

    /// API authentication failed.
    AuthenticationError,

    /// Card was declined.
    CardDeclined,

    /// Insufficient funds.
    InsufficientFunds,

    /// Invalid card details.
    InvalidCard,

    /// Resource not found.
    NotFound,

    /// Rate limit exceeded.
    RateLimitExceeded,

    /// Provider API error.
    ProviderError,

    /// Unknown error.
    Unknown,
}

impl PaymentErrorCode {
    /// Check if this error type is typically retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PaymentErrorCode::NetworkError
                | PaymentErrorCode::Timeout
                | PaymentErrorCode::RateLimitExceeded
        )
    }

    /// Maps a Stripe `decline_code` / `code` string.
    pub fn from_provider_code(code: &str) -> Self {
        match code {
            "card_declined" | "generic_decline" => PaymentErrorCode::CardDeclined,
            "insufficient_funds" => PaymentErrorCode::InsufficientFunds,
            "incorrect_number" | "invalid_number" | "invalid_cvc" | "expired_card" => {
                PaymentErrorCode::InvalidCard
            }
            "resource_missing" => PaymentErrorCode::NotFound,
            "rate_limit" => PaymentErrorCode::RateLimitExceeded,
            _ => PaymentErrorCode::ProviderError,
        }
    }
}

impl fmt::Display for PaymentErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentErrorCode::NetworkError => "network_error",
            PaymentErrorCode::Timeout => "timeout",
            PaymentErrorCode::AuthenticationError => "authentication_error",
            PaymentErrorCode::CardDeclined => "card_declined",
            PaymentErrorCode::InsufficientFunds => "insufficient_funds",
            PaymentErrorCode::InvalidCard => "invalid_card",
            PaymentErrorCode::NotFound => "not_found",
            PaymentErrorCode::RateLimitExceeded => "rate_limit_exceeded",
            PaymentErrorCode::ProviderError => "provider_error",
            PaymentErrorCode::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}
