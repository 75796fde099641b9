//! Invitation domain model
//!
//! An invitation offers membership in an organization to an email address.
//! Status is derived, never stored: an invitation is `pending` until it is
//! accepted or its expiry passes, and an expired invitation is a live record
//! that can be refreshed in place by a resend.

use chrono::{DateTime, Utc};
use orgkit_rbac::RoleId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Derived lifecycle state of an invitation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    /// Not yet accepted and not past expiry.
    Pending,
    /// Accepted; terminal.
    Accepted,
    /// Not accepted and past expiry. Can return to pending via resend.
    Expired,
}

/// An invitation to join an organization.
///
/// At most one non-accepted invitation may exist per (organization,
/// case-insensitive email); the store enforces that constraint behind the
/// engine's idempotent re-invite path. Tokens are globally unique and opaque.
///
/// # Examples
///
/// ```
/// use uuid::Uuid;
/// use orgkit_org::{Invitation, InvitationStatus};
/// use orgkit_rbac::RoleId;
///
/// let org_id = Uuid::now_v7();
/// let inv = Invitation::new(org_id, "User@Example.com", RoleId::MEMBER, "tok123", None);
/// assert_eq!(inv.email_normalized(), "user@example.com");
/// assert_eq!(inv.status(), InvitationStatus::Pending);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    /// Unique invitation ID
    pub id: Uuid,

    /// Organization ID
    pub organization_id: Uuid,

    /// Invited email address, as supplied (matching is case-insensitive)
    pub email: String,

    /// Role the accepted membership will carry (never `owner`)
    pub role: RoleId,

    /// Globally unique opaque token
    pub token: String,

    /// Who created the invitation (if applicable)
    pub invited_by: Option<Uuid>,

    /// When the invitation was accepted, if it was
    pub accepted_at: Option<DateTime<Utc>>,

    /// When the invitation expires; `None` means never
    pub expires_at: Option<DateTime<Utc>>,

    /// When the invitation was created
    pub created_at: DateTime<Utc>,

    /// When the invitation was last updated (resends)
    pub updated_at: DateTime<Utc>,
}

impl Invitation {
    /// Creates a new pending invitation with no expiry.
    ///
    /// # Arguments
    ///
    /// * `organization_id` - The organization ID
    /// * `email` - Invited email address
    /// * `role` - Role for the membership created on acceptance
    /// * `token` - Opaque token (uniqueness is the caller's concern)
    /// * `invited_by` - Who created the invitation
    pub fn new(
        organization_id: Uuid,
        email: impl Into<String>,
        role: RoleId,
        token: impl Into<String>,
        invited_by: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            organization_id,
            email: email.into(),
            role,
            token: token.into(),
            invited_by,
            accepted_at: None,
            expires_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the expiry timestamp.
    pub fn expires_at(mut self, at: Option<DateTime<Utc>>) -> Self {
        self.expires_at = at;
        self
    }

    /// The invited email lowercased for case-insensitive matching.
    pub fn email_normalized(&self) -> String {
        self.email.to_lowercase()
    }

    /// Check whether the invited email matches another, case-insensitively.
    pub fn email_matches(&self, other: &str) -> bool {
        self.email_normalized() == other.to_lowercase()
    }

    /// Derived status at a given instant.
    pub fn status_at(&self, now: DateTime<Utc>) -> InvitationStatus {
        if self.accepted_at.is_some() {
            InvitationStatus::Accepted
        } else if self.expires_at.is_some_and(|at| at <= now) {
            InvitationStatus::Expired
        } else {
            InvitationStatus::Pending
        }
    }

    /// Derived status now.
    pub fn status(&self) -> InvitationStatus {
        self.status_at(Utc::now())
    }

    /// Whether the invitation is currently pending.
    pub fn is_pending(&self) -> bool {
        self.status() == InvitationStatus::Pending
    }

    /// Whether the invitation has been accepted.
    pub fn is_accepted(&self) -> bool {
        self.accepted_at.is_some()
    }

    /// Whether the invitation is currently expired.
    pub fn is_expired(&self) -> bool {
        self.status() == InvitationStatus::Expired
    }
}
