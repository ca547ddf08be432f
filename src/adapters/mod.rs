//! Adapters - Implementations of port interfaces.
//!
//! Adapters connect the monetization core to external systems:
//! - `clock` - wall clock and a manually driven clock for tests
//! - `identity` - user email lookup
//! - `memory` - `dashmap`-backed repositories
//! - `postgres` - `sqlx` repositories and schema migrations
//! - `stripe` - Stripe billing gateway and a mock gateway

pub mod clock;
pub mod identity;
pub mod memory;
pub mod postgres;
pub mod stripe;

pub use clock::{ManualClock, SystemClock};
pub use identity::InMemoryIdentityProvider;
pub use memory::{
    InMemoryAdRewardRepository, InMemoryReferralRepository, InMemorySubscriptionRepository,
};
pub use postgres::{
    PostgresAdRewardRepository, PostgresReferralRepository, PostgresSubscriptionRepository,
};
pub use stripe::{MockPaymentGateway, StripeBillingGateway, StripeConfig};
