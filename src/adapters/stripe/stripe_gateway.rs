//! Stripe billing gateway.
//!
//! Implements `PaymentGateway` over the Stripe REST API:
//! 1. `POST /v1/customers` with the user's email
//! 2. `POST /v1/subscriptions` with inline `price_data` (USD, monthly)
//!
//! Cancellation is `DELETE /v1/subscriptions/{id}`.
//!
//! # Configuration
//!
//! ```ignore
//! let config = StripeConfig::new(api_key).with_request_timeout(Duration::from_secs(10));
//! let gateway = StripeBillingGateway::new(config)?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};

use crate::config::PaymentConfig;
use crate::ports::{
    BillingRequest, ExternalSubscriptionId, PaymentError, PaymentErrorCode, PaymentGateway,
};

use super::api_types::{StripeCustomer, StripeErrorEnvelope, StripeSubscription};

const DEFAULT_BASE_URL: &str = "https://api.stripe.com";

/// Stripe API configuration.
#[derive(Clone)]
pub struct StripeConfig {
    /// Stripe secret API key (sk_live_... or sk_test_...).
    api_key: SecretString,

    /// Base URL for Stripe API (default: https://api.stripe.com).
    api_base_url: String,

    request_timeout: Duration,
}

impl StripeConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::new(api_key.into()),
            api_base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }

    pub fn from_payment_config(config: &PaymentConfig) -> Self {
        Self {
            api_key: config.stripe_api_key.clone(),
            api_base_url: config.api_base_url.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Stripe implementation of the `PaymentGateway` port.
pub struct StripeBillingGateway {
    config: StripeConfig,
    http_client: reqwest::Client,
}

impl StripeBillingGateway {
    /// Builds the gateway and its HTTP client.
    ///
    /// # Errors
    ///
    /// `ProviderError` if the HTTP client cannot be constructed.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| PaymentError::provider(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            config,
            http_client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url.trim_end_matches('/'), path)
    }

    async fn post_form(
        &self,
        path: &str,
        params: &[(&str, String)],
        idempotency_key: Option<String>,
    ) -> Result<reqwest::Response, PaymentError> {
        let mut request = self
            .http_client
            .post(self.url(path))
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .form(params);
        if let Some(key) = idempotency_key {
            request = request.header("Idempotency-Key", key);
        }

        let response = request.send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response)
    }

    async fn create_customer(&self, request: &BillingRequest) -> Result<StripeCustomer, PaymentError> {
        let params = [
            ("email", request.user_email.clone()),
            ("metadata[user_id]", request.user_id.to_string()),
        ];
        let idempotency_key = request
            .idempotency_key
            .as_ref()
            .map(|k| format!("{}-customer", k));

        let response = self.post_form("/v1/customers", &params, idempotency_key).await?;
        response.json().await.map_err(parse_error)
    }

    async fn create_subscription(
        &self,
        customer_id: &str,
        request: &BillingRequest,
    ) -> Result<StripeSubscription, PaymentError> {
        let params = [
            ("customer", customer_id.to_string()),
            ("items[0][price_data][currency]", "usd".to_string()),
            (
                "items[0][price_data][product_data][name]",
                request.product_name.clone(),
            ),
            (
                "items[0][price_data][unit_amount]",
                request.price_cents.to_string(),
            ),
            (
                "items[0][price_data][recurring][interval]",
                "month".to_string(),
            ),
            (
                "items[0][price_data][recurring][interval_count]",
                request.interval_months.to_string(),
            ),
            ("metadata[user_id]", request.user_id.to_string()),
        ];
        let idempotency_key = request
            .idempotency_key
            .as_ref()
            .map(|k| format!("{}-subscription", k));

        let response = self
            .post_form("/v1/subscriptions", &params, idempotency_key)
            .await?;
        response.json().await.map_err(parse_error)
    }
}

#[async_trait]
impl PaymentGateway for StripeBillingGateway {
    async fn create_billing_subscription(
        &self,
        request: BillingRequest,
    ) -> Result<ExternalSubscriptionId, PaymentError> {
        let customer = self.create_customer(&request).await?;
        tracing::debug!(
            user_id = %request.user_id,
            customer_id = %customer.id,
            "Stripe customer created"
        );

        let subscription = self.create_subscription(&customer.id, &request).await?;
        tracing::info!(
            user_id = %request.user_id,
            customer_id = %customer.id,
            subscription_id = %subscription.id,
            status = %subscription.status,
            price_cents = request.price_cents,
            "Stripe subscription created"
        );

        Ok(ExternalSubscriptionId::new(subscription.id))
    }

    async fn cancel_billing_subscription(
        &self,
        subscription_id: &ExternalSubscriptionId,
    ) -> Result<(), PaymentError> {
        let url = self.url(&format!("/v1/subscriptions/{}", subscription_id));
        let response = self
            .http_client
            .delete(&url)
            .basic_auth(self.config.api_key.expose_secret(), Option::<&str>::None)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        tracing::info!(subscription_id = %subscription_id, "Stripe subscription cancelled");
        Ok(())
    }
}

fn transport_error(e: reqwest::Error) -> PaymentError {
    if e.is_timeout() {
        PaymentError::timeout(format!("Stripe request timed out: {}", e))
    } else {
        PaymentError::network(e.to_string())
    }
}

fn parse_error(e: reqwest::Error) -> PaymentError {
    PaymentError::provider(format!("Failed to parse Stripe response: {}", e))
}

/// Converts a non-2xx response into a typed error.
async fn api_error(response: reqwest::Response) -> PaymentError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let api_error = serde_json::from_str::<StripeErrorEnvelope>(&body)
        .ok()
        .map(|envelope| envelope.error);

    let message = api_error
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| format!("Stripe API error ({}): {}", status, body));
    let provider_code = api_error
        .as_ref()
        .and_then(|e| e.provider_code())
        .map(str::to_string);

    let code = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => PaymentErrorCode::AuthenticationError,
        StatusCode::NOT_FOUND => PaymentErrorCode::NotFound,
        StatusCode::TOO_MANY_REQUESTS => PaymentErrorCode::RateLimitExceeded,
        _ => provider_code
            .as_deref()
            .map(PaymentErrorCode::from_provider_code)
            .unwrap_or(PaymentErrorCode::ProviderError),
    };

    tracing::warn!(
        status = status.as_u16(),
        code = %code,
        provider_code = ?provider_code,
        "Stripe API call failed"
    );

    let mut error = PaymentError::new(code, message);
    if let Some(provider_code) = provider_code {
        error = error.with_provider_code(provider_code);
    }
    if status.is_server_error() {
        error.retryable = true;
    }
    error
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::UserId;
    use httpmock::prelude::*;
    use serde_json::json;

    fn request() -> BillingRequest {
        BillingRequest {
            user_id: UserId::new("u1").unwrap(),
            user_email: "u1@example.com".to_string(),
            product_name: "Basic - $5/month".to_string(),
            price_cents: 500,
            interval_months: 1,
            idempotency_key: Some("sub-key-1".to_string()),
        }
    }

    fn gateway(server: &MockServer) -> StripeBillingGateway {
        StripeBillingGateway::new(StripeConfig::new("sk_test_key").with_base_url(server.base_url()))
            .unwrap()
    }

    #[test]
    fn config_defaults_to_stripe_api() {
        let config = StripeConfig::new("sk_test_key");
        assert_eq!(config.api_base_url, "https://api.stripe.com");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn config_from_payment_section() {
        let mut payment = PaymentConfig::new("sk_test_key");
        payment.api_base_url = "http://localhost:12111".to_string();
        payment.request_timeout_secs = 3;

        let config = StripeConfig::from_payment_config(&payment);
        assert_eq!(config.api_base_url, "http://localhost:12111");
        assert_eq!(config.request_timeout, Duration::from_secs(3));
    }

    #[tokio::test]
    async fn creates_customer_then_subscription() {
        let server = MockServer::start_async().await;
        let customer_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/customers")
                .header("Idempotency-Key", "sub-key-1-customer")
                .x_www_form_urlencoded_tuple("email", "u1@example.com");
            then.status(200).json_body(json!({
                "id": "cus_123",
                "object": "customer",
                "email": "u1@example.com"
            }));
        });
        let subscription_mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/subscriptions")
                .header("Idempotency-Key", "sub-key-1-subscription")
                .x_www_form_urlencoded_tuple("customer", "cus_123")
                .x_www_form_urlencoded_tuple("items[0][price_data][currency]", "usd")
                .x_www_form_urlencoded_tuple("items[0][price_data][unit_amount]", "500")
                .x_www_form_urlencoded_tuple("items[0][price_data][recurring][interval]", "month");
            then.status(200).json_body(json!({
                "id": "sub_123",
                "object": "subscription",
                "customer": "cus_123",
                "status": "active"
            }));
        });

        let id = gateway(&server)
            .create_billing_subscription(request())
            .await
            .unwrap();

        assert_eq!(id.as_str(), "sub_123");
        customer_mock.assert();
        subscription_mock.assert();
    }

    #[tokio::test]
    async fn card_decline_maps_to_typed_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/customers");
            then.status(200).json_body(json!({"id": "cus_123", "email": "u1@example.com"}));
        });
        server.mock(|when, then| {
            when.method(POST).path("/v1/subscriptions");
            then.status(402).json_body(json!({
                "error": {
                    "type": "card_error",
                    "code": "card_declined",
                    "decline_code": "insufficient_funds",
                    "message": "Your card has insufficient funds."
                }
            }));
        });

        let err = gateway(&server)
            .create_billing_subscription(request())
            .await
            .unwrap_err();

        assert_eq!(err.code, PaymentErrorCode::InsufficientFunds);
        assert_eq!(err.provider_code.as_deref(), Some("insufficient_funds"));
        assert_eq!(err.message, "Your card has insufficient funds.");
        assert!(!err.retryable);
    }

    #[tokio::test]
    async fn bad_api_key_is_authentication_error() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/customers");
            then.status(401).json_body(json!({
                "error": {"type": "invalid_request_error", "message": "Invalid API Key provided"}
            }));
        });

        let err = gateway(&server)
            .create_billing_subscription(request())
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::AuthenticationError);
    }

    #[tokio::test]
    async fn server_error_is_retryable() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/customers");
            then.status(500).body("upstream unavailable");
        });

        let err = gateway(&server)
            .create_billing_subscription(request())
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::ProviderError);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn slow_response_times_out() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/v1/customers");
            then.status(200)
                .delay(Duration::from_millis(500))
                .json_body(json!({"id": "cus_123"}));
        });

        let gateway = StripeBillingGateway::new(
            StripeConfig::new("sk_test_key")
                .with_base_url(server.base_url())
                .with_request_timeout(Duration::from_millis(50)),
        )
        .unwrap();

        let err = gateway
            .create_billing_subscription(request())
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::Timeout);
        assert!(err.retryable);
    }

    #[tokio::test]
    async fn cancel_deletes_subscription() {
        let server = MockServer::start_async().await;
        let cancel_mock = server.mock(|when, then| {
            when.method(DELETE).path("/v1/subscriptions/sub_123");
            then.status(200).json_body(json!({
                "id": "sub_123",
                "customer": "cus_123",
                "status": "canceled"
            }));
        });

        gateway(&server)
            .cancel_billing_subscription(&ExternalSubscriptionId::new("sub_123"))
            .await
            .unwrap();
        cancel_mock.assert();
    }

    #[tokio::test]
    async fn cancel_unknown_subscription_is_not_found() {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(DELETE).path("/v1/subscriptions/sub_missing");
            then.status(404).json_body(json!({
                "error": {
                    "type": "invalid_request_error",
                    "code": "resource_missing",
                    "message": "No such subscription: 'sub_missing'"
                }
            }));
        });

        let err = gateway(&server)
            .cancel_billing_subscription(&ExternalSubscriptionId::new("sub_missing"))
            .await
            .unwrap_err();
        assert_eq!(err.code, PaymentErrorCode::NotFound);
    }
}
