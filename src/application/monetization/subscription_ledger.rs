//! SubscriptionLedger - creates, checks, expires and cancels subscriptions.
//!
//! Billing is started at the payment gateway before anything is stored; a
//! failed local write cancels the billing again so neither side is left
//! with an orphan. Replacing an open-ended subscription also stops the
//! billing of the record it supersedes.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::config::MonetizationConfig;
use crate::domain::foundation::UserId;
use crate::domain::monetization::{MonetizationError, Subscription, TierCatalog};
use crate::ports::{
    BillingRequest, Clock, ExternalSubscriptionId, IdentityProvider, PaymentError,
    PaymentErrorCode, PaymentGateway, SubscriptionRepository,
};

/// Service owning the subscription lifecycle.
pub struct SubscriptionLedger {
    catalog: Arc<TierCatalog>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    gateway: Arc<dyn PaymentGateway>,
    identity: Arc<dyn IdentityProvider>,
    clock: Arc<dyn Clock>,
    billing_interval_months: u32,
    payment_timeout: Duration,
}

impl SubscriptionLedger {
    pub fn new(
        config: &MonetizationConfig,
        catalog: Arc<TierCatalog>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        gateway: Arc<dyn PaymentGateway>,
        identity: Arc<dyn IdentityProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            subscriptions,
            gateway,
            identity,
            clock,
            billing_interval_months: config.billing_interval_months,
            payment_timeout: config.payment_timeout(),
        }
    }

    /// Overrides the bound on a single gateway call.
    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    /// Subscribes the user to `tier_name`, replacing any active subscription.
    ///
    /// The new record inherits the superseded one's unused referral credit.
    ///
    /// # Errors
    ///
    /// - `UnknownTier` if the tier is not in the catalog
    /// - `NotFound` if the identity provider does not know the user
    /// - `PaymentFailure` if billing fails or times out; nothing is stored
    /// - `Infrastructure` if the record cannot be stored; billing is cancelled
    pub async fn create_subscription(
        &self,
        user_id: &UserId,
        tier_name: &str,
    ) -> Result<Subscription, MonetizationError> {
        let tier = self.catalog.get(tier_name)?.clone();

        let email = self
            .identity
            .email_for(user_id)
            .await?
            .ok_or_else(|| MonetizationError::not_found("User", user_id))?;

        let mut subscription =
            Subscription::activate(user_id.clone(), tier.name, None, self.clock.now());

        let request = BillingRequest {
            user_id: user_id.clone(),
            user_email: email,
            product_name: tier.display_name(),
            price_cents: tier.price_cents,
            interval_months: self.billing_interval_months,
            idempotency_key: Some(subscription.id.to_string()),
        };

        let external_id = self
            .call_gateway(self.gateway.create_billing_subscription(request))
            .await
            .map_err(|e| {
                tracing::warn!(
                    user_id = %user_id,
                    tier = %tier.name,
                    code = %e.code,
                    retryable = e.retryable,
                    "Billing subscription failed"
                );
                MonetizationError::from(e)
            })?;
        subscription.external_id = Some(external_id.as_str().to_string());

        let replacement = match self.subscriptions.replace_active(&subscription).await {
            Ok(replacement) => replacement,
            Err(store_error) => {
                tracing::error!(
                    user_id = %user_id,
                    external_id = %external_id,
                    error = %store_error,
                    "Failed to store subscription, cancelling billing"
                );
                self.compensate_billing(&external_id).await;
                return Err(store_error.into());
            }
        };

        if let Some(superseded) = &replacement.superseded {
            self.stop_superseded_billing(superseded).await;
        }

        tracing::info!(
            user_id = %user_id,
            subscription_id = %replacement.current.id,
            tier = %tier.name,
            price_cents = tier.price_cents,
            superseded = ?replacement.superseded.as_ref().map(|s| s.id),
            inherited_credit_days = replacement.current.banked_credit_days,
            "Subscription created"
        );

        Ok(replacement.current)
    }

    /// Whether the user currently has a usable subscription.
    ///
    /// Samples the clock on every call. A record whose tier is no longer in
    /// the catalog is treated as suspended.
    pub async fn is_valid(&self, user_id: &UserId) -> Result<bool, MonetizationError> {
        let now = self.clock.now();
        let Some(current) = self.subscriptions.current(user_id).await? else {
            tracing::debug!(user_id = %user_id, "No subscription on record");
            return Ok(false);
        };

        let tier_known = current.tier.map_or(false, |t| self.catalog.contains(t));
        Ok(tier_known && current.is_valid_at(now))
    }

    /// Marks the user's current subscription inactive. Idempotent.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user never had a subscription.
    pub async fn expire(&self, user_id: &UserId) -> Result<(), MonetizationError> {
        let expired = self
            .subscriptions
            .deactivate_current(user_id, self.clock.now())
            .await?
            .ok_or_else(|| MonetizationError::not_found("Subscription", user_id))?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %expired.id,
            "Subscription expired"
        );
        Ok(())
    }

    /// Stops billing and fixes the end date at now plus banked referral
    /// credit.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the user has no active subscription, or a concurrent
    ///   subscribe replaced it while billing was being cancelled
    /// - `PaymentFailure` if the gateway refuses; the record is untouched
    pub async fn cancel_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Subscription, MonetizationError> {
        let active = self
            .subscriptions
            .current(user_id)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| MonetizationError::not_found("Active subscription", user_id))?;

        if let Some(external_id) = active.external_id.as_deref() {
            let external_id = ExternalSubscriptionId::new(external_id);
            match self
                .call_gateway(self.gateway.cancel_billing_subscription(&external_id))
                .await
            {
                Ok(()) => {}
                Err(e) if e.code == PaymentErrorCode::NotFound => {
                    tracing::warn!(
                        user_id = %user_id,
                        external_id = %external_id,
                        "Billing subscription already gone at gateway"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Closes the record whose billing was just stopped, not whatever a
        // concurrent subscribe may have made active in the meantime.
        let closed = self
            .subscriptions
            .close_active(user_id, &active.id, self.clock.now())
            .await?
            .ok_or_else(|| {
                tracing::warn!(
                    user_id = %user_id,
                    subscription_id = %active.id,
                    "Subscription superseded while cancelling"
                );
                MonetizationError::not_found("Active subscription", user_id)
            })?;

        tracing::info!(
            user_id = %user_id,
            subscription_id = %closed.id,
            end = ?closed.end,
            "Subscription cancelled"
        );
        Ok(closed)
    }

    /// The user's latest subscription record, active or not.
    pub async fn current_subscription(
        &self,
        user_id: &UserId,
    ) -> Result<Option<Subscription>, MonetizationError> {
        Ok(self.subscriptions.current(user_id).await?)
    }

    /// Every subscription record of the user, oldest first.
    pub async fn history(&self, user_id: &UserId) -> Result<Vec<Subscription>, MonetizationError> {
        Ok(self.subscriptions.history(user_id).await?)
    }

    async fn call_gateway<T>(
        &self,
        call: impl Future<Output = Result<T, PaymentError>>,
    ) -> Result<T, PaymentError> {
        match tokio::time::timeout(self.payment_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PaymentError::timeout(format!(
                "Payment gateway did not answer within {:?}",
                self.payment_timeout
            ))),
        }
    }

    /// Stops the billing of a record that a new subscription replaced.
    ///
    /// A record with an end date was cancelled earlier and bills nothing.
    async fn stop_superseded_billing(&self, superseded: &Subscription) {
        if superseded.end.is_some() {
            return;
        }
        let Some(external_id) = superseded.external_id.as_deref() else {
            return;
        };
        let external_id = ExternalSubscriptionId::new(external_id);
        match self
            .call_gateway(self.gateway.cancel_billing_subscription(&external_id))
            .await
        {
            Ok(()) => {}
            Err(e) if e.code == PaymentErrorCode::NotFound => {
                tracing::debug!(external_id = %external_id, "Superseded billing already gone");
            }
            Err(e) => {
                tracing::error!(
                    user_id = %superseded.user_id,
                    subscription_id = %superseded.id,
                    external_id = %external_id,
                    code = %e.code,
                    "Failed to cancel superseded billing; manual cleanup required"
                );
            }
        }
    }

    async fn compensate_billing(&self, external_id: &ExternalSubscriptionId) {
        if let Err(e) = self
            .call_gateway(self.gateway.cancel_billing_subscription(external_id))
            .await
        {
            tracing::error!(
                external_id = %external_id,
                code = %e.code,
                "Compensating billing cancellation failed; manual cleanup required"
            );
        }
    }
}
