//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, the timestamp value object, the state machine trait
//! and the error vocabulary shared by every monetization component.

mod errors;
mod ids;
mod state_machine;
mod timestamp;

pub use errors::{DomainError, ErrorCode, ValidationError};
pub use ids::{AdRewardId, ReferralId, SubscriptionId, UserId};
pub use state_machine::StateMachine;
pub use timestamp::Timestamp;
