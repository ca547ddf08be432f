//! Monetization error types.
//!
//! Every exposed operation returns `Result<_, MonetizationError>` so callers
//! can tell each failure kind apart.
//!
//! # HTTP Status Mapping (owned by the API layer)
//!
//! | Error | HTTP Status |
//! |-------|-------------|
//! | UnknownTier | 400 |
//! | PaymentFailure | 402 |
//! | InvalidReferral | 400 |
//! | DuplicateReferral | 409 |
//! | AlreadyFulfilled | 409 |
//! | NotFound | 404 |
//! | ValidationFailed | 400 |
//! | Infrastructure | 500 |

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, ReferralId, UserId, ValidationError};
use crate::ports::{PaymentError, PaymentErrorCode};

/// Monetization-specific errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonetizationError {
    /// Tier name is not in the enumerated set or not configured.
    #[error("Unknown subscription tier: {0}")]
    UnknownTier(String),

    /// The payment processor rejected or failed to answer the billing request.
    #[error("Payment failed ({code}): {reason}")]
    PaymentFailure {
        code: PaymentErrorCode,
        reason: String,
        retryable: bool,
    },

    /// A user tried to refer themselves.
    #[error("User {0} cannot refer themselves")]
    InvalidReferral(UserId),

    /// The (referrer, referred) pair was already recorded.
    #[error("Referral from {referrer} to {referred} already exists")]
    DuplicateReferral { referrer: UserId, referred: UserId },

    /// The referral reward has already been credited.
    #[error("Referral {0} has already been fulfilled")]
    AlreadyFulfilled(ReferralId),

    /// A user or record is missing.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Input failed validation.
    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    /// Persistence or other infrastructure failure.
    #[error("Infrastructure error: {0}")]
    Infrastructure(String),
}

impl MonetizationError {
    pub fn unknown_tier(name: impl Into<String>) -> Self {
        MonetizationError::UnknownTier(name.into())
    }

    pub fn invalid_referral(user_id: UserId) -> Self {
        MonetizationError::InvalidReferral(user_id)
    }

    pub fn duplicate_referral(referrer: UserId, referred: UserId) -> Self {
        MonetizationError::DuplicateReferral { referrer, referred }
    }

    pub fn already_fulfilled(id: ReferralId) -> Self {
        MonetizationError::AlreadyFulfilled(id)
    }

    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        MonetizationError::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MonetizationError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn infrastructure(message: impl Into<String>) -> Self {
        MonetizationError::Infrastructure(message.into())
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MonetizationError::UnknownTier(_) => ErrorCode::UnknownTier,
            MonetizationError::PaymentFailure { .. } => ErrorCode::PaymentFailed,
            MonetizationError::InvalidReferral(_) => ErrorCode::InvalidReferral,
            MonetizationError::DuplicateReferral { .. } => ErrorCode::DuplicateReferral,
            MonetizationError::AlreadyFulfilled(_) => ErrorCode::AlreadyFulfilled,
            MonetizationError::NotFound { .. } => ErrorCode::NotFound,
            MonetizationError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MonetizationError::Infrastructure(_) => ErrorCode::DatabaseError,
        }
    }

    /// Hint for the caller; this crate never retries on its own.
    pub fn is_retryable(&self) -> bool {
        match self {
            MonetizationError::PaymentFailure { retryable, .. } => *retryable,
            MonetizationError::Infrastructure(_) => true,
            _ => false,
        }
    }
}

impl From<PaymentError> for MonetizationError {
    fn from(err: PaymentError) -> Self {
        MonetizationError::PaymentFailure {
            code: err.code,
            reason: err.message,
            retryable: err.retryable,
        }
    }
}

impl From<ValidationError> for MonetizationError {
    fn from(err: ValidationError) -> Self {
        let field = match &err {
            ValidationError::EmptyField { field }
            | ValidationError::OutOfRange { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field.clone(),
        };
        MonetizationError::ValidationFailed {
            field,
            message: err.to_string(),
        }
    }
}

impl From<DomainError> for MonetizationError {
    fn from(err: DomainError) -> Self {
        match err.code {
            ErrorCode::ValidationFailed => MonetizationError::ValidationFailed {
                field: err
                    .details
                    .get("field")
                    .cloned()
                    .unwrap_or_else(|| "unknown".to_string()),
                message: err.message,
            },
            ErrorCode::UnknownTier => MonetizationError::UnknownTier(err.message),
            _ => MonetizationError::Infrastructure(err.to_string()),
        }
    }
}

impl From<MonetizationError> for DomainError {
    fn from(err: MonetizationError) -> Self {
        DomainError::new(err.code(), err.to_string())
    }
}
