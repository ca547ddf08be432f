//! Payment gateway adapters.
//!
//! - `StripeBillingGateway` - Stripe REST integration (customer, then a
//!   subscription with inline monthly USD pricing)
//! - `MockPaymentGateway` - in-process gateway with error injection and
//!   latency for tests
//!
//! API keys are held as `secrecy::SecretString` and never logged.

mod api_types;
mod mock_payment_gateway;
mod stripe_gateway;

pub use api_types::{StripeApiError, StripeCustomer, StripeErrorEnvelope, StripeSubscription};
pub use mock_payment_gateway::{MethodCall, MockPaymentGateway, CANCEL_METHOD, CREATE_METHOD};
pub use stripe_gateway::{StripeBillingGateway, StripeConfig};
