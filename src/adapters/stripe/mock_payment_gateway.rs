//! Mock payment gateway for testing.
//!
//! Provides a configurable implementation of `PaymentGateway` for unit and
//! integration tests. Supports:
//! - Error injection (next call, or per method)
//! - Artificial latency, to exercise caller timeouts
//! - Call tracking

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{BillingRequest, ExternalSubscriptionId, PaymentError, PaymentGateway};

pub const CREATE_METHOD: &str = "create_billing_subscription";
pub const CANCEL_METHOD: &str = "cancel_billing_subscription";

/// Mock payment gateway for testing.
///
/// # Example
///
/// ```ignore
/// let mock = MockPaymentGateway::new();
/// mock.set_method_error(CREATE_METHOD, PaymentError::card_declined("Test decline"));
///
/// let result = mock.create_billing_subscription(request).await;
/// assert!(result.is_err());
/// assert_eq!(mock.call_count(CREATE_METHOD), 1);
/// ```
#[derive(Default, Clone)]
pub struct MockPaymentGateway {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Monotonic counter for generated ids.
    next_id: u64,

    /// Billing subscriptions created and not cancelled.
    active: BTreeSet<String>,

    /// Billing subscriptions cancelled through the mock.
    cancelled: Vec<String>,

    /// Error to return on next call (consumed).
    next_error: Option<PaymentError>,

    /// Sticky errors by method name.
    method_errors: HashMap<String, PaymentError>,

    latency: Option<Duration>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: PaymentError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for every call to a specific method.
    pub fn set_method_error(&self, method: &str, error: PaymentError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    /// Delay every call by `latency` before answering.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Call Tracking
    // ════════════════════════════════════════════════════════════════════════════

    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.state().call_log.iter().any(|c| c.method == method)
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    pub fn clear_calls(&self) {
        self.state().call_log.clear();
    }

    /// Billing subscriptions created and not yet cancelled.
    pub fn active_billing(&self) -> Vec<ExternalSubscriptionId> {
        self.state()
            .active
            .iter()
            .map(ExternalSubscriptionId::new)
            .collect()
    }

    /// Billing subscriptions cancelled, in call order.
    pub fn cancelled_billing(&self) -> Vec<ExternalSubscriptionId> {
        self.state()
            .cancelled
            .iter()
            .map(ExternalSubscriptionId::new)
            .collect()
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Internal Helpers
    // ════════════════════════════════════════════════════════════════════════════

    /// Records the call and returns the configured latency.
    fn record_call(&self, method: &str, args: Vec<String>) -> Option<Duration> {
        let mut state = self.state();
        state.call_log.push(MethodCall {
            method: method.to_string(),
            args,
        });
        state.latency
    }

    fn check_error(&self, method: &str) -> Result<(), PaymentError> {
        let mut state = self.state();

        if let Some(error) = state.method_errors.get(method) {
            return Err(error.clone());
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    async fn create_billing_subscription(
        &self,
        request: BillingRequest,
    ) -> Result<ExternalSubscriptionId, PaymentError> {
        let latency = self.record_call(
            CREATE_METHOD,
            vec![
                request.user_id.to_string(),
                request.user_email.clone(),
                request.price_cents.to_string(),
            ],
        );
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_error(CREATE_METHOD)?;

        let mut state = self.state();
        state.next_id += 1;
        let id = format!("sub_mock_{}", state.next_id);
        state.active.insert(id.clone());
        Ok(ExternalSubscriptionId::new(id))
    }

    async fn cancel_billing_subscription(
        &self,
        subscription_id: &ExternalSubscriptionId,
    ) -> Result<(), PaymentError> {
        let latency = self.record_call(CANCEL_METHOD, vec![subscription_id.to_string()]);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_error(CANCEL_METHOD)?;

        let mut state = self.state();
        if !state.active.remove(subscription_id.as_str()) {
            return Err(PaymentError::not_found("Billing subscription"));
        }
        state.cancelled.push(subscription_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use crate::ports::PaymentErrorCode;

    fn request() -> BillingRequest {
        BillingRequest {
            user_id: UserId::new("u1").unwrap(),
            user_email: "u1@example.com".to_string(),
            product_name: "Basic - $5/month".to_string(),
            price_cents: 500,
            interval_months: 1,
            idempotency_key: None,
        }
    }

    #[tokio::test]
    async fn create_returns_unique_ids() {
        let mock = MockPaymentGateway::new();
        let a = mock.create_billing_subscription(request()).await.unwrap();
        let b = mock.create_billing_subscription(request()).await.unwrap();

        assert_ne!(a, b);
        assert_eq!(mock.call_count(CREATE_METHOD), 2);
        assert_eq!(mock.active_billing().len(), 2);
    }

    #[tokio::test]
    async fn next_error_is_consumed() {
        let mock = MockPaymentGateway::new();
        mock.set_error(PaymentError::network("connection reset"));

        assert!(mock.create_billing_subscription(request()).await.is_err());
        assert!(mock.create_billing_subscription(request()).await.is_ok());
    }

    #[tokio::test]
    async fn method_error_is_sticky() {
        let mock = MockPaymentGateway::new();
        mock.set_method_error(CREATE_METHOD, PaymentError::card_declined("declined"));

        for _ in 0..2 {
            let err = mock.create_billing_subscription(request()).await.unwrap_err();
            assert_eq!(err.code, PaymentErrorCode::CardDeclined);
        }

        mock.clear_errors();
        assert!(mock.create_billing_subscription(request()).await.is_ok());
    }

    #[tokio::test]
    async fn cancel_moves_subscription_to_cancelled() {
        let mock = MockPaymentGateway::new();
        let id = mock.create_billing_subscription(request()).await.unwrap();

        mock.cancel_billing_subscription(&id).await.unwrap();
        assert!(mock.active_billing().is_empty());
        assert_eq!(mock.cancelled_billing(), vec![id.clone()]);

        let err = mock.cancel_billing_subscription(&id).await.unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NotFound);
    }

    #[tokio::test]
    async fn latency_delays_answer() {
        let mock = MockPaymentGateway::new();
        mock.set_latency(Duration::from_millis(40));

        let started = std::time::Instant::now();
        mock.create_billing_subscription(request()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(40));
    }

    #[tokio::test]
    async fn clones_share_state() {
        let mock = MockPaymentGateway::new();
        let clone = mock.clone();
        clone.create_billing_subscription(request()).await.unwrap();
        assert!(mock.was_called(CREATE_METHOD));
        assert_eq!(mock.calls()[0].args[0], "u1");
    }
}
