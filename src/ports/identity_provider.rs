//! Identity provider port.
//!
//! Authentication happens upstream; the monetization core receives an
//! already-authenticated `UserId` and only needs contact details for billing.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, UserId};

/// Read access to the authentication collaborator's user records.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Email address registered for the user.
    ///
    /// Returns `None` if the identity provider does not know the user.
    async fn email_for(&self, user_id: &UserId) -> Result<Option<String>, DomainError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_provider_is_object_safe() {
        fn _accepts_dyn(_provider: &dyn IdentityProvider) {}
    }
}
