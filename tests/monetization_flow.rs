//! End-to-end monetization flows over the in-memory adapters.
//!
//! Covers the user journey across all three services, plus concurrent callers
//! racing on the same user or referral.

use std::sync::Arc;

use chrono::Duration;
use futures::future::join_all;
use proptest::prelude::*;

use flavorapp::adapters::{
    InMemoryIdentityProvider, InMemoryReferralRepository, ManualClock, MockPaymentGateway,
};
use flavorapp::adapters::stripe::{CANCEL_METHOD, CREATE_METHOD};
use flavorapp::application::{MonetizationPorts, MonetizationServices};
use flavorapp::config::MonetizationConfig;
use flavorapp::domain::foundation::{Timestamp, UserId};
use flavorapp::domain::monetization::{MonetizationError, Referral, TierName};
use flavorapp::ports::{Clock, ReferralInsert, ReferralRepository};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct App {
    services: Arc<MonetizationServices>,
    clock: ManualClock,
    gateway: MockPaymentGateway,
}

fn user(id: &str) -> UserId {
    UserId::new(id).unwrap()
}

fn start() -> Timestamp {
    Timestamp::parse_rfc3339("2025-03-01T12:00:00Z").unwrap()
}

fn app() -> App {
    let identity = InMemoryIdentityProvider::new();
    for id in ["u1", "u2", "u3"] {
        identity.register(user(id), format!("{}@example.com", id));
    }
    let clock = ManualClock::new(start());
    let gateway = MockPaymentGateway::new();

    let ports = MonetizationPorts::in_memory(
        Arc::new(gateway.clone()),
        Arc::new(identity),
        Arc::new(clock.clone()),
    );
    let services = MonetizationServices::new(&MonetizationConfig::default(), ports).unwrap();

    App {
        services: Arc::new(services),
        clock,
        gateway,
    }
}

async fn active_count(app: &App, user_id: &UserId) -> usize {
    app.services
        .ledger
        .history(user_id)
        .await
        .unwrap()
        .iter()
        .filter(|s| s.active)
        .count()
}

// =============================================================================
// User Journey
// =============================================================================

#[tokio::test]
async fn subscribe_watch_ads_and_refer_a_friend() {
    let app = app();
    let u1 = user("u1");
    let u2 = user("u2");

    // Basic tier at $5.00
    let basic = app.services.catalog.get("basic").unwrap();
    assert_eq!(basic.price_display(), "5.00");
    let sub = app.services.ledger.create_subscription(&u1, "basic").await.unwrap();
    assert_eq!(sub.tier, Some(TierName::Basic));
    assert!(app.services.ledger.is_valid(&u1).await.unwrap());
    assert_eq!(app.gateway.call_count(CREATE_METHOD), 1);

    // An ad reward lasts one window
    app.services.ad_rewards.grant_reward(&u1, "recipe").await.unwrap();
    assert_eq!(app.services.ad_rewards.active_rewards(&u1).await.unwrap().count(), 1);
    app.clock.advance(Duration::hours(24) + Duration::seconds(1));
    assert!(app.services.ad_rewards.active_rewards(&u1).await.unwrap().is_empty());

    // Referral credit is banked on the open-ended subscription
    let referral = app.services.referrals.process_referral(&u1, &u2).await.unwrap();
    let fulfilled = app.services.referrals.fulfill_referral(&referral.id).await.unwrap();
    assert!(fulfilled.rewarded);

    let current = app.services.ledger.current_subscription(&u1).await.unwrap().unwrap();
    assert_eq!(current.banked_credit_days, 14);
    assert!(current.end.is_none());

    let again = app.services.referrals.fulfill_referral(&referral.id).await.unwrap_err();
    assert_eq!(again, MonetizationError::AlreadyFulfilled(referral.id));

    // Cancelling converts banked credit into an end date
    let now = app.clock.now();
    let cancelled = app.services.ledger.cancel_subscription(&u1).await.unwrap();
    assert_eq!(cancelled.end, Some(now.add_days(14)));
    assert_eq!(cancelled.banked_credit_days, 0);
    assert_eq!(app.gateway.call_count(CANCEL_METHOD), 1);

    app.clock.advance(Duration::days(13));
    assert!(app.services.ledger.is_valid(&u1).await.unwrap());
    app.clock.advance(Duration::days(1));
    assert!(!app.services.ledger.is_valid(&u1).await.unwrap());
}

#[tokio::test]
async fn upgrade_supersedes_previous_subscription() {
    let app = app();
    let u1 = user("u1");

    let basic = app.services.ledger.create_subscription(&u1, "basic").await.unwrap();
    app.clock.advance(Duration::days(3));
    let premium = app.services.ledger.create_subscription(&u1, "premium").await.unwrap();

    let history = app.services.ledger.history(&u1).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].id, basic.id);
    assert!(!history[0].active);
    assert_eq!(history[1].id, premium.id);
    assert!(history[1].active);
    assert_eq!(active_count(&app, &u1).await, 1);

    // Only the premium plan is still billed
    assert_eq!(app.gateway.active_billing().len(), 1);
    assert_eq!(app.gateway.call_count(CANCEL_METHOD), 1);
}

#[tokio::test]
async fn referral_credit_survives_an_upgrade() {
    let app = app();
    let u1 = user("u1");
    let u2 = user("u2");

    app.services.ledger.create_subscription(&u1, "basic").await.unwrap();
    let referral = app.services.referrals.process_referral(&u1, &u2).await.unwrap();
    app.services.referrals.fulfill_referral(&referral.id).await.unwrap();

    let premium = app.services.ledger.create_subscription(&u1, "premium").await.unwrap();
    assert_eq!(premium.banked_credit_days, 14);

    let now = app.clock.now();
    let cancelled = app.services.ledger.cancel_subscription(&u1).await.unwrap();
    assert_eq!(cancelled.end, Some(now.add_days(14)));
}

#[tokio::test]
async fn referral_waits_while_subscription_is_expired() {
    let app = app();
    let u1 = user("u1");
    let u2 = user("u2");

    app.services.ledger.create_subscription(&u1, "basic").await.unwrap();
    app.services.ledger.expire(&u1).await.unwrap();
    let referral = app.services.referrals.process_referral(&u1, &u2).await.unwrap();

    let err = app.services.referrals.fulfill_referral(&referral.id).await.unwrap_err();
    assert!(matches!(err, MonetizationError::NotFound { .. }));

    // Resubscribing lets the same referral pay out
    app.services.ledger.create_subscription(&u1, "basic").await.unwrap();
    let fulfilled = app.services.referrals.fulfill_referral(&referral.id).await.unwrap();
    assert!(fulfilled.rewarded);
    let current = app.services.ledger.current_subscription(&u1).await.unwrap().unwrap();
    assert_eq!(current.banked_credit_days, 14);
}

#[tokio::test]
async fn self_and_duplicate_referrals_are_rejected() {
    let app = app();
    let u1 = user("u1");
    let u2 = user("u2");

    let err = app.services.referrals.process_referral(&u1, &u1).await.unwrap_err();
    assert_eq!(err, MonetizationError::InvalidReferral(u1.clone()));

    app.services.referrals.process_referral(&u1, &u2).await.unwrap();
    let err = app.services.referrals.process_referral(&u1, &u2).await.unwrap_err();
    assert_eq!(
        err,
        MonetizationError::DuplicateReferral {
            referrer: u1.clone(),
            referred: u2.clone(),
        }
    );

    // The reverse direction is a different pair
    app.services.referrals.process_referral(&u2, &u1).await.unwrap();
    assert_eq!(app.services.referrals.referrals_by(&u1).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_tier_touches_nothing() {
    let app = app();
    let u1 = user("u1");

    let err = app.services.ledger.create_subscription(&u1, "gold").await.unwrap_err();

    assert_eq!(err, MonetizationError::UnknownTier("gold".to_string()));
    assert!(!app.gateway.was_called(CREATE_METHOD));
    assert!(app.services.ledger.history(&u1).await.unwrap().is_empty());
}

// =============================================================================
// Concurrency
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_subscribes_leave_one_active() {
    let app = app();
    let u1 = user("u1");

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let services = app.services.clone();
            let u1 = u1.clone();
            let tier = if i % 2 == 0 { "basic" } else { "premium" };
            tokio::spawn(async move { services.ledger.create_subscription(&u1, tier).await })
        })
        .collect();

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    assert_eq!(app.services.ledger.history(&u1).await.unwrap().len(), 16);
    assert_eq!(active_count(&app, &u1).await, 1);
    assert_eq!(app.gateway.active_billing().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_fulfillment_credits_once() {
    let app = app();
    let u1 = user("u1");
    let u2 = user("u2");
    app.services.ledger.create_subscription(&u1, "basic").await.unwrap();
    let referral = app.services.referrals.process_referral(&u1, &u2).await.unwrap();

    let handles: Vec<_> = (0..12)
        .map(|_| {
            let services = app.services.clone();
            let id = referral.id;
            tokio::spawn(async move { services.referrals.fulfill_referral(&id).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap())
        .collect();

    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(succeeded, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| *e == MonetizationError::AlreadyFulfilled(referral.id)));

    let current = app.services.ledger.current_subscription(&u1).await.unwrap().unwrap();
    assert_eq!(current.banked_credit_days, 14);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_referrals_insert_once() {
    let repo = Arc::new(InMemoryReferralRepository::new());
    let now = start();

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let repo = repo.clone();
            let referral = Referral::record(user("u1"), user("u2"), TierName::Basic, now).unwrap();
            tokio::spawn(async move { repo.insert_if_absent(&referral).await })
        })
        .collect();

    let inserted = join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .filter(|outcome| matches!(outcome, ReferralInsert::Inserted))
        .count();

    assert_eq!(inserted, 1);
    assert_eq!(repo.len(), 1);
}

// =============================================================================
// Properties
// =============================================================================

#[derive(Debug, Clone)]
enum Op {
    Subscribe(TierName),
    Cancel,
    Expire,
    Wait(i64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Subscribe(TierName::Basic)),
        Just(Op::Subscribe(TierName::Premium)),
        Just(Op::Cancel),
        Just(Op::Expire),
        (1i64..40).prop_map(Op::Wait),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, failure_persistence: None, ..ProptestConfig::default() })]

    #[test]
    fn at_most_one_active_subscription(ops in prop::collection::vec(op(), 1..20)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let app = app();
            let u1 = user("u1");

            for op in ops {
                match op {
                    Op::Subscribe(tier) => {
                        app.services.ledger.create_subscription(&u1, tier.as_str()).await.unwrap();
                    }
                    // Either may legitimately be NotFound here
                    Op::Cancel => {
                        let _ = app.services.ledger.cancel_subscription(&u1).await;
                    }
                    Op::Expire => {
                        let _ = app.services.ledger.expire(&u1).await;
                    }
                    Op::Wait(days) => app.clock.advance(Duration::days(days)),
                }
                assert!(active_count(&app, &u1).await <= 1);
            }
        });
    }
}
