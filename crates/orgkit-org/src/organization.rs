//! Organization domain model
//!
//! Organizations are the top-level tenant entities. An organization owns its
//! memberships and invitations; the ownership invariant (exactly one `owner`
//! membership once any membership exists) is enforced by the engine, not by
//! this model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// An organization represents a tenant in the multi-tenant system.
///
/// Users can belong to multiple organizations with different roles. The
/// current owner is not a field here; it is whichever membership carries the
/// `owner` role, so ownership transfers never leave a stale pointer behind.
///
/// # Examples
///
/// ```
/// use orgkit_org::Organization;
///
/// let org = Organization::new("Acme Corp");
/// assert_eq!(org.name, "Acme Corp");
/// assert!(org.metadata.is_empty());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier for the organization
    pub id: Uuid,

    /// Human-readable name
    pub name: String,

    /// When the organization was created
    pub created_at: DateTime<Utc>,

    /// When the organization was last updated
    pub updated_at: DateTime<Utc>,

    /// Custom metadata for host extensibility
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Organization {
    /// Creates a new organization.
    ///
    /// The organization is created with a newly generated UUID v7 ID, the
    /// current timestamps, and an empty metadata map.
    ///
    /// # Arguments
    ///
    /// * `name` - The organization display name
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }

    /// Attach a metadata entry.
    ///
    /// # Arguments
    ///
    /// * `key` - Metadata key
    /// * `value` - Arbitrary JSON value
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}
