//! Monetization domain module.
//!
//! Subscription tiers, per-user subscriptions, ad rewards and referrals.
//!
//! # Module Structure
//!
//! - `tier` - Tier names, prices and feature sets
//! - `catalog` - Immutable tier lookup table
//! - `subscription` - Subscription entity and validity rules
//! - `ad_reward` - Ad reward entity and the active-reward view
//! - `referral` - Referral entity and fulfillment state machine
//! - `errors` - Typed failures for every exposed operation

mod ad_reward;
mod catalog;
mod errors;
mod referral;
mod subscription;
mod tier;

pub use ad_reward::{ActiveRewards, AdReward};
pub use catalog::TierCatalog;
pub use errors::MonetizationError;
pub use referral::{Referral, ReferralStatus};
pub use subscription::Subscription;
pub use tier::{FeatureValue, Tier, TierName};
