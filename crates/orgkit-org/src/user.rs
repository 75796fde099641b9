//! User account reference model
//!
//! The engine does not own user identity; hosts supply whatever account
//! system they like. [`UserAccount`] is the minimal projection the core
//! needs: a stable id and an email address for invitation matching.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimal user record consumed by the engine.
///
/// # Examples
///
/// ```
/// use orgkit_org::UserAccount;
///
/// let user = UserAccount::new("ada@example.com");
/// assert_eq!(user.email_normalized(), "ada@example.com");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    /// Unique user ID
    pub id: Uuid,

    /// Email address, as supplied (matching is case-insensitive)
    pub email: String,

    /// When the account was created
    pub created_at: DateTime<Utc>,
}

impl UserAccount {
    /// Creates a new user account with a generated UUID v7 ID.
    ///
    /// # Arguments
    ///
    /// * `email` - The account email address
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            email: email.into(),
            created_at: Utc::now(),
        }
    }

    /// The email lowercased for case-insensitive matching.
    pub fn email_normalized(&self) -> String {
        self.email.to_lowercase()
    }
}
