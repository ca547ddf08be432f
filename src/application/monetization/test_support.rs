//! Shared wiring for service unit tests.

use std::sync::Arc;

use crate::adapters::{
    InMemoryAdRewardRepository, InMemoryIdentityProvider, InMemoryReferralRepository,
    InMemorySubscriptionRepository, ManualClock, MockPaymentGateway,
};
use crate::config::MonetizationConfig;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::monetization::TierCatalog;

use super::{AdRewardTracker, ReferralEngine, SubscriptionLedger};

pub(crate) struct Fixture {
    pub config: MonetizationConfig,
    pub catalog: Arc<TierCatalog>,
    pub clock: ManualClock,
    pub gateway: MockPaymentGateway,
    pub identity: Arc<InMemoryIdentityProvider>,
    pub subscriptions: Arc<InMemorySubscriptionRepository>,
    pub ad_rewards: Arc<InMemoryAdRewardRepository>,
    pub referrals: Arc<InMemoryReferralRepository>,
}

impl Fixture {
    pub fn new() -> Self {
        let config = MonetizationConfig::default();
        let catalog = Arc::new(TierCatalog::from_config(&config).unwrap());
        let identity = InMemoryIdentityProvider::new();
        for id in ["u1", "u2", "u3"] {
            identity.register(UserId::new(id).unwrap(), format!("{}@example.com", id));
        }

        Self {
            config,
            catalog,
            clock: ManualClock::new(Self::start_instant()),
            gateway: MockPaymentGateway::new(),
            identity: Arc::new(identity),
            subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
            ad_rewards: Arc::new(InMemoryAdRewardRepository::new()),
            referrals: Arc::new(InMemoryReferralRepository::new()),
        }
    }

    fn start_instant() -> Timestamp {
        Timestamp::parse_rfc3339("2025-03-01T12:00:00Z").unwrap()
    }

    pub fn start(&self) -> Timestamp {
        Self::start_instant()
    }

    pub fn user(&self, id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    pub fn ledger(&self) -> SubscriptionLedger {
        SubscriptionLedger::new(
            &self.config,
            self.catalog.clone(),
            self.subscriptions.clone(),
            Arc::new(self.gateway.clone()),
            self.identity.clone(),
            Arc::new(self.clock.clone()),
        )
    }

    pub fn ad_reward_tracker(&self) -> AdRewardTracker {
        AdRewardTracker::new(
            &self.config,
            self.ad_rewards.clone(),
            Arc::new(self.clock.clone()),
        )
    }

    pub fn referral_engine(&self) -> ReferralEngine {
        ReferralEngine::new(
            &self.config,
            self.referrals.clone(),
            self.subscriptions.clone(),
            Arc::new(self.clock.clone()),
        )
    }
}
