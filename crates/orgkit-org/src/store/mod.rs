//! Storage abstraction
//!
//! The engine talks to a durable store through these traits. The store must
//! provide three uniqueness constraints as the last line of defense behind
//! the engine's in-memory checks:
//!
//! - one membership per (user, organization)
//! - one non-accepted invitation per (organization, lower(email))
//! - globally unique invitation tokens
//!
//! Constraint violations surface as [`StoreError::UniqueViolation`] so the
//! engine can translate a lost race into the matching idempotent success or
//! typed error instead of leaking a raw storage failure.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::invitation::Invitation;
use crate::membership::Membership;
use crate::organization::Organization;
use crate::user::UserAccount;

#[cfg(feature = "memory")]
pub mod memory;
#[cfg(feature = "memory")]
pub use memory::MemoryDirectory;

/// The uniqueness constraints a conforming store enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// (user_id, organization_id) on memberships.
    MembershipUserOrg,
    /// (organization_id, lower(email)) on non-accepted invitations.
    InvitationPendingEmail,
    /// Invitation token, globally.
    InvitationToken,
}

/// Storage error types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected a write (usually a lost race).
    #[error("unique constraint violated: {0:?}")]
    UniqueViolation(Constraint),

    /// The row targeted by an update does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Organization persistence.
#[async_trait]
pub trait OrganizationStore: Send + Sync {
    /// Insert a new organization.
    async fn insert_organization(&self, organization: &Organization) -> StoreResult<()>;

    /// Fetch an organization by id.
    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>>;
}

/// Membership persistence.
#[async_trait]
pub trait MembershipStore: Send + Sync {
    /// Insert a new membership, enforcing (user, organization) uniqueness.
    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()>;

    /// Fetch the membership of a user in an organization.
    async fn membership(&self, organization: Uuid, user: Uuid) -> StoreResult<Option<Membership>>;

    /// Replace an existing membership row (matched on (user, organization)).
    async fn update_membership(&self, membership: &Membership) -> StoreResult<()>;

    /// Remove a membership if present, returning the removed row.
    async fn remove_membership(
        &self,
        organization: Uuid,
        user: Uuid,
    ) -> StoreResult<Option<Membership>>;

    /// All memberships of an organization.
    async fn members_of(&self, organization: Uuid) -> StoreResult<Vec<Membership>>;

    /// The organization's `owner` membership, if any.
    async fn owner_of(&self, organization: Uuid) -> StoreResult<Option<Membership>>;

    /// All memberships held by a user across organizations.
    async fn memberships_for_user(&self, user: Uuid) -> StoreResult<Vec<Membership>>;
}

/// Invitation persistence.
#[async_trait]
pub trait InvitationStore: Send + Sync {
    /// Insert a new invitation, enforcing the pending-email and token
    /// constraints.
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    /// Fetch an invitation by id.
    async fn invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>>;

    /// Fetch an invitation by token.
    async fn invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>>;

    /// Replace an existing invitation row (matched on id), re-checking token
    /// uniqueness.
    async fn update_invitation(&self, invitation: &Invitation) -> StoreResult<()>;

    /// The non-accepted invitation for (organization, lower(email)), if any.
    /// Expired invitations count; they are live rows.
    async fn open_invitation(
        &self,
        organization: Uuid,
        email_lower: &str,
    ) -> StoreResult<Option<Invitation>>;

    /// All invitations addressed to an email, case-insensitively.
    async fn invitations_for_email(&self, email_lower: &str) -> StoreResult<Vec<Invitation>>;

    /// Whether any invitation carries the token.
    async fn token_exists(&self, token: &str) -> StoreResult<bool>;
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user.
    async fn insert_user(&self, user: &UserAccount) -> StoreResult<()>;

    /// Fetch a user by id.
    async fn user(&self, id: Uuid) -> StoreResult<Option<UserAccount>>;

    /// Fetch a user by email, case-insensitively.
    async fn user_by_email(&self, email_lower: &str) -> StoreResult<Option<UserAccount>>;

    /// Remove a user if present, returning the removed row.
    async fn remove_user(&self, id: Uuid) -> StoreResult<Option<UserAccount>>;
}

/// Everything the engine needs from a store.
pub trait Directory:
    OrganizationStore + MembershipStore + InvitationStore + UserStore + Send + Sync
{
}

impl<T> Directory for T where
    T: OrganizationStore + MembershipStore + InvitationStore + UserStore + Send + Sync
{
}
