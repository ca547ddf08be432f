//! Error types for the domain layer.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;
use thiserror::Error;

/// Errors that occur during value object construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: i64,
        max: i64,
        actual: i64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: i64, max: i64, actual: i64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Error codes organized by category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    ValidationFailed,
    InvalidStateTransition,

    // Not found errors
    NotFound,
    UnknownTier,

    // Monetization rule violations
    InvalidReferral,
    DuplicateReferral,
    AlreadyFulfilled,

    // External collaborators
    PaymentFailed,
    ExternalServiceError,
    Timeout,

    // Infrastructure errors
    DatabaseError,
    ConcurrencyConflict,
    InternalError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::InvalidStateTransition => "INVALID_STATE_TRANSITION",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::UnknownTier => "UNKNOWN_TIER",
            ErrorCode::InvalidReferral => "INVALID_REFERRAL",
            ErrorCode::DuplicateReferral => "DUPLICATE_REFERRAL",
            ErrorCode::AlreadyFulfilled => "ALREADY_FULFILLED",
            ErrorCode::PaymentFailed => "PAYMENT_FAILED",
            ErrorCode::ExternalServiceError => "EXTERNAL_SERVICE_ERROR",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Standard domain error with code, message, and optional details.
///
/// Returned by persistence and identity ports.
#[derive(Debug, Clone)]
pub struct DomainError {
    pub code: ErrorCode,
    pub message: String,
    pub details: HashMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: HashMap::new(),
        }
    }

    /// Creates a validation error for a specific field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationFailed, message).with_detail("field", field.into())
    }

    /// Creates a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Adds a detail to the error.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// Returns the error message.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

impl From<ValidationError> for DomainError {
    fn from(err: ValidationError) -> Self {
        DomainError::new(ErrorCode::ValidationFailed, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_empty_field_displays_correctly() {
        let err = ValidationError::empty_field("ad_type");
        assert_eq!(format!("{}", err), "Field 'ad_type' cannot be empty");
    }

    #[test]
    fn validation_error_out_of_range_displays_correctly() {
        let err = ValidationError::out_of_range("price_cents", 0, 100_000, -5);
        assert_eq!(
            format!("{}", err),
            "Field 'price_cents' must be between 0 and 100000, got -5"
        );
    }

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::NotFound, "Referral not found");
        assert_eq!(format!("{}", err), "[NOT_FOUND] Referral not found");
    }

    #[test]
    fn domain_error_with_detail_adds_detail() {
        let err = DomainError::validation("ad_type", "must not be empty")
            .with_detail("reason", "blank");

        assert_eq!(err.details.get("field"), Some(&"ad_type".to_string()));
        assert_eq!(err.details.get("reason"), Some(&"blank".to_string()));
    }

    #[test]
    fn validation_error_converts_to_domain_error() {
        let err: DomainError = ValidationError::empty_field("user_id").into();
        assert_eq!(err.code, ErrorCode::ValidationFailed);
        assert!(err.message().contains("user_id"));
    }
}
