//! Wiring of the three monetization services over one set of ports.

use std::sync::Arc;

use crate::adapters::{
    InMemoryAdRewardRepository, InMemoryReferralRepository, InMemorySubscriptionRepository,
};
use crate::config::MonetizationConfig;
use crate::domain::monetization::{MonetizationError, TierCatalog};
use crate::ports::{
    AdRewardRepository, Clock, IdentityProvider, PaymentGateway, ReferralRepository,
    SubscriptionRepository,
};

use super::{AdRewardTracker, ReferralEngine, SubscriptionLedger};

/// Collaborators shared by the services.
///
/// The ledger and the referral engine must see the same subscription store,
/// so both are built from this one struct.
#[derive(Clone)]
pub struct MonetizationPorts {
    pub subscriptions: Arc<dyn SubscriptionRepository>,
    pub ad_rewards: Arc<dyn AdRewardRepository>,
    pub referrals: Arc<dyn ReferralRepository>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub identity: Arc<dyn IdentityProvider>,
    pub clock: Arc<dyn Clock>,
}

impl MonetizationPorts {
    /// Ports backed by process-local stores.
    pub fn in_memory(
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            subscriptions: Arc::new(InMemorySubscriptionRepository::new()),
            ad_rewards: Arc::new(InMemoryAdRewardRepository::new()),
            referrals: Arc::new(InMemoryReferralRepository::new()),
            gateway,
            identity,
            clock,
        }
    }
}

/// Entry point for callers: catalog plus the three services.
pub struct MonetizationServices {
    pub catalog: Arc<TierCatalog>,
    pub ledger: SubscriptionLedger,
    pub ad_rewards: AdRewardTracker,
    pub referrals: ReferralEngine,
}

impl MonetizationServices {
    /// Validates the configuration, builds the catalog and wires the services.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if the configuration does not pass
    /// [`MonetizationConfig::validate`], e.g. an empty catalog or a referral
    /// reward tier missing from it.
    pub fn new(
        config: &MonetizationConfig,
        ports: MonetizationPorts,
    ) -> Result<Self, MonetizationError> {
        config
            .validate()
            .map_err(|e| MonetizationError::validation("monetization", e.to_string()))?;
        let catalog = Arc::new(TierCatalog::from_config(config)?);

        let ledger = SubscriptionLedger::new(
            config,
            catalog.clone(),
            ports.subscriptions.clone(),
            ports.gateway,
            ports.identity,
            ports.clock.clone(),
        );
        let ad_rewards = AdRewardTracker::new(config, ports.ad_rewards, ports.clock.clone());
        let referrals =
            ReferralEngine::new(config, ports.referrals, ports.subscriptions, ports.clock);

        tracing::debug!(tiers = catalog.len(), "Monetization services wired");

        Ok(Self {
            catalog,
            ledger,
            ad_rewards,
            referrals,
        })
    }
}
