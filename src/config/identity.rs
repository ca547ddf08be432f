//! Identity configuration
//!
//! Users known to the in-memory identity provider, keyed by user id.
//! Set through `FLAVORAPP__IDENTITY__USERS__<user_id>=<email>`.

use serde::Deserialize;
use std::collections::BTreeMap;

use super::error::ValidationError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityConfig {
    /// Email address per user id
    #[serde(default)]
    pub users: BTreeMap<String, String>,
}

impl IdentityConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (user_id, email) in &self.users {
            if user_id.trim().is_empty() {
                return Err(ValidationError::InvalidIdentityUser(user_id.clone()));
            }
            if !is_plausible_email(email) {
                return Err(ValidationError::InvalidUserEmail(user_id.clone()));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn is_plausible_email(email: &str) -> bool {
    match email.trim().split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}
