//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the domain and the outside world. Adapters implement these ports.
//!
//! ## Collaborator Ports
//!
//! - `PaymentGateway` - Recurring billing with the payment processor
//! - `IdentityProvider` - Contact details of authenticated users
//! - `Clock` - Current instant
//!
//! ## Persistence Ports
//!
//! - `SubscriptionRepository` - Per-user subscription arena with atomic replace
//! - `AdRewardRepository` - Append-only ad rewards
//! - `ReferralRepository` - Unique referral pairs with compare-and-set rewards

mod ad_reward_repository;
mod clock;
mod identity_provider;
mod payment_gateway;
mod referral_repository;
mod subscription_repository;

pub use ad_reward_repository::AdRewardRepository;
pub use clock::Clock;
pub use identity_provider::IdentityProvider;
pub use payment_gateway::{
    BillingRequest, ExternalSubscriptionId, PaymentError, PaymentErrorCode, PaymentGateway,
};
pub use referral_repository::{ReferralInsert, ReferralRepository, RewardClaim};
pub use subscription_repository::{Replacement, SubscriptionRepository};
