//! In-memory repository adapters.
//!
//! Backed by `dashmap` so per-key updates are atomic without a store-wide
//! lock. Suitable for tests and single-node deployments.

mod ad_reward_repository;
mod referral_repository;
mod subscription_repository;

pub use ad_reward_repository::InMemoryAdRewardRepository;
pub use referral_repository::InMemoryReferralRepository;
pub use subscription_repository::InMemorySubscriptionRepository;
