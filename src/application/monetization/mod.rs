//! Monetization services.
//!
//! - `SubscriptionLedger` - paid subscriptions, validity checks, cancellation
//! - `AdRewardTracker` - time-boxed rewards for watched ads
//! - `ReferralEngine` - referral recording and reward fulfillment
//!
//! [`MonetizationServices`] wires all three over one [`MonetizationPorts`].

mod ad_reward_tracker;
mod referral_engine;
mod services;
mod subscription_ledger;

#[cfg(test)]
mod test_support;

pub use ad_reward_tracker::AdRewardTracker;
pub use referral_engine::ReferralEngine;
pub use services::{MonetizationPorts, MonetizationServices};
pub use subscription_ledger::SubscriptionLedger;
