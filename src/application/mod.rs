//! Application layer - services that orchestrate domain operations.
//!
//! Services receive their collaborators as ports and never reach for
//! concrete adapters.

pub mod monetization;

pub use monetization::{
    AdRewardTracker, MonetizationPorts, MonetizationServices, ReferralEngine,
    SubscriptionLedger,
};
