//! Membership domain model
//!
//! A membership links a user to an organization with a role. Memberships are
//! unique per (user, organization); the store enforces that constraint as the
//! last line of defense behind the engine's checks.

use chrono::{DateTime, Utc};
use orgkit_rbac::RoleId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organization membership linking a user to an organization.
///
/// The `owner` role may only appear here via organization creation or an
/// ownership transfer; generic add/promote paths refuse it.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use orgkit_org::Membership;
/// use orgkit_rbac::RoleId;
///
/// let org_id = Uuid::now_v7();
/// let user_id = Uuid::now_v7();
/// let membership = Membership::new(org_id, user_id, RoleId::MEMBER);
/// assert!(!membership.is_owner());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique membership ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// User ID
    pub user_id: Uuid,

    /// Role within the organization
    pub role: RoleId,

    /// Who invited this user (if applicable)
    pub invited_by: Option<Uuid>,

    /// When the user joined
    pub joined_at: DateTime<Utc>,

    /// When the membership was last updated (role changes)
    pub updated_at: DateTime<Utc>,
}

impl Membership {
    /// Creates a new membership.
    ///
    /// The membership is created with a newly generated UUID v7 ID, current
    /// timestamps, and no inviter.
    ///
    /// # Arguments
    ///
    /// * `organization_id` - The organization ID
    /// * `user_id` - The user ID
    /// * `role` - The user's role in the organization
    pub fn new(organization_id: Uuid, user_id: Uuid, role: RoleId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            user_id,
            role,
            invited_by: None,
            joined_at: now,
            updated_at: now,
        }
    }

    /// Set who invited this user.
    ///
    /// # Arguments
    ///
    /// * `inviter_id` - The user ID of who invited this user
    pub fn with_inviter(mut self, inviter_id: Uuid) -> Self {
        self.invited_by = Some(inviter_id);
        self
    }

    /// Check whether this membership carries the `owner` role.
    pub fn is_owner(&self) -> bool {
        self.role.is_owner()
    }
}
