//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (IDs, timestamps, errors)
//! - `monetization` - Tiers, subscriptions, ad rewards and referrals

pub mod foundation;
pub mod monetization;
