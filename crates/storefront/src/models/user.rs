//! Account records for the local identity provider.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use corewell_core::{Email, UserId};

use super::session::Identity;

/// A registered account, stored at `accounts/<normalized email>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Unique user ID.
    pub uid: UserId,
    /// User's email address (normalized).
    pub email: Email,
    /// Argon2 PHC string.
    pub password_hash: String,
    /// When the account was registered.
    pub registered_at: DateTime<Utc>,
}

impl Account {
    /// The identity this account signs in as.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            uid: self.uid.clone(),
            email: self.email.clone(),
        }
    }
}
