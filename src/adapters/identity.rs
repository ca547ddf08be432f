//! In-memory identity provider.
//!
//! Stands in for the authentication service in development and tests.
//! The binary seeds it from `IdentityConfig`.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::config::IdentityConfig;
use crate::domain::foundation::{DomainError, UserId};
use crate::ports::IdentityProvider;

/// Identity provider backed by a concurrent map of user emails.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    emails: DashMap<UserId, String>,
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a user's email.
    pub fn register(&self, user_id: UserId, email: impl Into<String>) {
        self.emails.insert(user_id, email.into());
    }

    /// Provider seeded with the configured users.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` if a configured user id is blank.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, DomainError> {
        let provider = Self::new();
        for (user_id, email) in &config.users {
            provider.register(UserId::new(user_id.as_str())?, email.trim());
        }
        Ok(provider)
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }

    /// Builder-style registration.
    pub fn with_user(self, user_id: UserId, email: impl Into<String>) -> Self {
        self.register(user_id, email);
        self
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    async fn email_for(&self, user_id: &UserId) -> Result<Option<String>, DomainError> {
        Ok(self.emails.get(user_id).map(|e| e.value().clone()))
    }
}
