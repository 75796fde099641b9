//! Error taxonomy for membership and invitation operations
//!
//! Every failure kind is a distinct, catchable variant carrying enough
//! structure (organization, user, permission, role) for a caller to build a
//! user-facing message without string parsing. Idempotent conditions
//! (already-a-member, same-role change, transfer to the current owner,
//! double-accept with an intact membership) are successes, not errors, and
//! never appear here.

use orgkit_rbac::{Permission, RoleConfigError, RoleId};
use thiserror::Error;
use uuid::Uuid;

use crate::store::StoreError;

/// Membership engine and invitation lifecycle errors.
#[derive(Debug, Error)]
pub enum OrgError {
    // --- Authorization ---
    /// The acting user holds no membership in the organization.
    #[error("user {user} is not a member of organization {organization}")]
    NotAMember { organization: Uuid, user: Uuid },

    /// The acting user's role does not grant the required permission.
    #[error("user {user} lacks the '{permission}' permission in organization {organization}")]
    NotAuthorized {
        organization: Uuid,
        user: Uuid,
        permission: Permission,
    },

    // --- Invariant violations ---
    /// An operation would create a second `owner` membership.
    #[error("organization {organization} already has an owner")]
    CannotHaveMultipleOwners { organization: Uuid },

    /// The current owner cannot be removed; transfer ownership first.
    #[error("cannot remove the owner of organization {organization}; transfer ownership first")]
    CannotRemoveOwner { organization: Uuid, user: Uuid },

    /// The current owner cannot be demoted; transfer ownership first.
    #[error("cannot demote the owner of organization {organization}; transfer ownership first")]
    CannotDemoteOwner { organization: Uuid, user: Uuid },

    /// The `owner` role can only be assigned through an ownership transfer.
    #[error("cannot promote user {user} to owner; use an ownership transfer")]
    CannotPromoteToOwner { organization: Uuid, user: Uuid },

    /// Invitations may never carry the `owner` role.
    #[error("invitations cannot carry the owner role")]
    CannotInviteAsOwner { organization: Uuid },

    /// Defense-in-depth: an invitation carrying `owner` cannot be accepted.
    #[error("an invitation carrying the owner role cannot be accepted")]
    CannotAcceptAsOwner { invitation: Uuid },

    /// Corrupted state: the organization has memberships but no owner.
    #[error("organization {organization} has no owner membership")]
    NoOwnerPresent { organization: Uuid },

    /// A promotion/demotion moved in the wrong direction.
    #[error("invalid role change from '{from}' to '{to}'")]
    InvalidRoleChange { from: RoleId, to: RoleId },

    // --- Transfer-specific ---
    /// Ownership can only be transferred to an existing member.
    #[error("user {user} is not a member of organization {organization} and cannot receive ownership")]
    CannotTransferToNonMember { organization: Uuid, user: Uuid },

    /// Ownership can only be transferred to an admin-ranked member.
    #[error("user {user} is below admin rank in organization {organization} and cannot receive ownership")]
    CannotTransferToNonAdmin { organization: Uuid, user: Uuid },

    // --- Invitation lifecycle ---
    /// The invitation was accepted and its membership no longer exists;
    /// invitations are single-use and never silently re-create membership.
    #[error("invitation {invitation} has already been accepted")]
    InvitationAlreadyAccepted { invitation: Uuid },

    /// The invitation is past its expiry.
    #[error("invitation {invitation} has expired")]
    InvitationExpired { invitation: Uuid },

    /// The accepting user's email does not match the invitation.
    #[error("the accepting user's email does not match invitation {invitation}")]
    EmailMismatch { invitation: Uuid },

    /// No invitation with the given id exists.
    #[error("invitation {0} not found")]
    InvitationNotFound(Uuid),

    /// The invited email already belongs to a member of the organization.
    #[error("'{email}' already belongs to a member of organization {organization}")]
    AlreadyAMember { organization: Uuid, email: String },

    /// Token generation exhausted its collision-retry budget.
    #[error("could not generate a unique invitation token")]
    TokenGeneration,

    // --- Validation ---
    /// Organization names must not be blank.
    #[error("organization name must not be blank")]
    InvalidOrganizationName,

    // --- Deletion guard / limits ---
    /// The user still owns organizations and cannot be deleted.
    #[error("user {user} still owns {owned} organization(s) and cannot be deleted")]
    CannotDeleteOwner { user: Uuid, owned: usize },

    /// The user has reached the configured maximum of owned organizations.
    #[error("user {user} already owns the maximum of {limit} organizations")]
    TooManyOwnedOrganizations { user: Uuid, limit: u32 },

    // --- Host policy (strict hooks) ---
    /// A strict pre-commit hook vetoed the operation.
    #[error("{0}")]
    Policy(String),

    // --- Lookups ---
    /// No organization with the given id exists.
    #[error("organization {0} not found")]
    OrganizationNotFound(Uuid),

    /// No user with the given id exists.
    #[error("user {0} not found")]
    UserNotFound(Uuid),

    // --- Configuration / storage ---
    /// Role hierarchy configuration or lookup error.
    #[error(transparent)]
    RoleConfig(#[from] RoleConfigError),

    /// Storage failure that could not be translated into a domain outcome.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for membership and invitation operations.
pub type OrgResult<T> = Result<T, OrgError>;

impl OrgError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            OrgError::NotAMember { .. } => "NOT_A_MEMBER",
            OrgError::NotAuthorized { .. } => "NOT_AUTHORIZED",
            OrgError::CannotHaveMultipleOwners { .. } => "CANNOT_HAVE_MULTIPLE_OWNERS",
            OrgError::CannotRemoveOwner { .. } => "CANNOT_REMOVE_OWNER",
            OrgError::CannotDemoteOwner { .. } => "CANNOT_DEMOTE_OWNER",
            OrgError::CannotPromoteToOwner { .. } => "CANNOT_PROMOTE_TO_OWNER",
            OrgError::CannotInviteAsOwner { .. } => "CANNOT_INVITE_AS_OWNER",
            OrgError::CannotAcceptAsOwner { .. } => "CANNOT_ACCEPT_AS_OWNER",
            OrgError::NoOwnerPresent { .. } => "NO_OWNER_PRESENT",
            OrgError::InvalidRoleChange { .. } => "INVALID_ROLE_CHANGE",
            OrgError::CannotTransferToNonMember { .. } => "CANNOT_TRANSFER_TO_NON_MEMBER",
            OrgError::CannotTransferToNonAdmin { .. } => "CANNOT_TRANSFER_TO_NON_ADMIN",
            OrgError::InvitationAlreadyAccepted { .. } => "INVITATION_ALREADY_ACCEPTED",
            OrgError::InvitationExpired { .. } => "INVITATION_EXPIRED",
            OrgError::EmailMismatch { .. } => "EMAIL_MISMATCH",
            OrgError::InvitationNotFound(_) => "INVITATION_NOT_FOUND",
            OrgError::AlreadyAMember { .. } => "ALREADY_A_MEMBER",
            OrgError::TokenGeneration => "TOKEN_GENERATION",
            OrgError::InvalidOrganizationName => "INVALID_ORGANIZATION_NAME",
            OrgError::CannotDeleteOwner { .. } => "CANNOT_DELETE_OWNER",
            OrgError::TooManyOwnedOrganizations { .. } => "TOO_MANY_OWNED_ORGANIZATIONS",
            OrgError::Policy(_) => "POLICY_VIOLATION",
            OrgError::OrganizationNotFound(_) => "ORGANIZATION_NOT_FOUND",
            OrgError::UserNotFound(_) => "USER_NOT_FOUND",
            OrgError::RoleConfig(e) => e.error_code(),
            OrgError::Store(_) => "STORE_ERROR",
        }
    }

    /// Check if this error reflects corrupted or infrastructure state rather
    /// than a rejected request.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            OrgError::NoOwnerPresent { .. } | OrgError::TokenGeneration | OrgError::Store(_)
        )
    }
}
