use std::sync::Arc;

use flavorapp::adapters::{
    postgres, InMemoryIdentityProvider, PostgresAdRewardRepository, PostgresReferralRepository,
    PostgresSubscriptionRepository, StripeBillingGateway, StripeConfig, SystemClock,
};
use flavorapp::application::{MonetizationPorts, MonetizationServices};
use flavorapp::config::AppConfig;
use flavorapp::ports::{Clock, IdentityProvider, PaymentGateway};
use flavorapp::telemetry;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    telemetry::init_tracing(&config.logging);

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeBillingGateway::new(
        StripeConfig::from_payment_config(&config.payment),
    )?);
    // Users are provisioned by the authentication service; this process only
    // needs their contact details, seeded from FLAVORAPP__IDENTITY__USERS__*.
    let identity = InMemoryIdentityProvider::from_config(&config.identity)?;
    if identity.is_empty() {
        tracing::warn!("No identity users configured; every subscribe will be NotFound");
    } else {
        tracing::info!(users = identity.len(), "Identity users loaded");
    }
    let identity: Arc<dyn IdentityProvider> = Arc::new(identity);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let ports = match &config.database {
        Some(database) => {
            let pool = postgres::connect(database).await?;
            if database.run_migrations {
                postgres::run_migrations(&pool).await?;
                tracing::info!("Database migrations applied");
            }
            MonetizationPorts {
                subscriptions: Arc::new(PostgresSubscriptionRepository::new(pool.clone())),
                ad_rewards: Arc::new(PostgresAdRewardRepository::new(pool.clone())),
                referrals: Arc::new(PostgresReferralRepository::new(pool)),
                gateway,
                identity,
                clock,
            }
        }
        None => {
            tracing::warn!("No database configured; using in-memory stores");
            MonetizationPorts::in_memory(gateway, identity, clock)
        }
    };

    let services = MonetizationServices::new(&config.monetization, ports)?;
    for tier in services.catalog.tiers() {
        tracing::info!(
            tier = %tier.name,
            price = %tier.price_display(),
            features = tier.features.len(),
            "Tier available"
        );
    }
    tracing::info!(
        test_mode = config.payment.is_test_mode(),
        "FlavorApp monetization ready"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    Ok(())
}
