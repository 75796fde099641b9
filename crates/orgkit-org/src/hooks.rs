//! Lifecycle hook dispatch
//!
//! A synchronous in-process hook bus with two dispatch modes:
//!
//! - **Strict (pre-commit, vetoable)**: dispatched with an in-memory
//!   candidate before any write. The first hook error propagates to the
//!   caller verbatim and the write must not happen. This is the only mode
//!   where policy enforcement (seat limits, quotas) belongs.
//! - **Lenient (post-commit, best-effort)**: dispatched after the write has
//!   committed. Hook errors are logged through `tracing` and never escape
//!   into the caller's control flow. Used for notifications, analytics, and
//!   audit events.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use orgkit_rbac::{Permission, RoleId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{OrgError, OrgResult};
use crate::invitation::Invitation;
use crate::membership::Membership;
use crate::organization::Organization;

/// Lifecycle events dispatched by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// An organization and its owner membership were created.
    OrganizationCreated,
    /// An invitation is about to be / has been created.
    MemberInvited,
    /// A membership was created (direct add or invitation acceptance).
    MemberJoined,
    /// A membership was destroyed.
    MemberRemoved,
    /// A membership's role changed.
    RoleChanged,
    /// Ownership moved from one member to another.
    OwnershipTransferred,
}

impl HookEvent {
    /// Get string representation of the event.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrganizationCreated => "organization_created",
            Self::MemberInvited => "member_invited",
            Self::MemberJoined => "member_joined",
            Self::MemberRemoved => "member_removed",
            Self::RoleChanged => "role_changed",
            Self::OwnershipTransferred => "ownership_transferred",
        }
    }
}

/// Immutable context passed to hooks.
///
/// Carries whichever fields are relevant to the event; hooks never mutate it.
/// In strict dispatch the entity fields hold the not-yet-persisted candidate.
#[derive(Debug, Clone)]
pub struct HookContext {
    /// The event being dispatched
    pub event: HookEvent,
    /// Organization involved, if loaded
    pub organization: Option<Organization>,
    /// Membership involved (candidate or committed)
    pub membership: Option<Membership>,
    /// Invitation involved (candidate or committed)
    pub invitation: Option<Invitation>,
    /// Subject user of the event
    pub user: Option<Uuid>,
    /// Actor who invited
    pub invited_by: Option<Uuid>,
    /// Actor who removed
    pub removed_by: Option<Uuid>,
    /// Actor who changed a role
    pub changed_by: Option<Uuid>,
    /// Previous role on a role change
    pub old_role: Option<RoleId>,
    /// New role on a role change
    pub new_role: Option<RoleId>,
    /// Previous owner on a transfer
    pub old_owner: Option<Uuid>,
    /// New owner on a transfer
    pub new_owner: Option<Uuid>,
    /// Permission that gated the operation, for authorization-adjacent events
    pub permission: Option<Permission>,
    /// Minimum role required of the target, where one applies
    pub required_role: Option<RoleId>,
}

impl HookContext {
    /// Create an empty context for an event.
    pub fn new(event: HookEvent) -> Self {
        Self {
            event,
            organization: None,
            membership: None,
            invitation: None,
            user: None,
            invited_by: None,
            removed_by: None,
            changed_by: None,
            old_role: None,
            new_role: None,
            old_owner: None,
            new_owner: None,
            permission: None,
            required_role: None,
        }
    }

    /// Attach the organization.
    pub fn with_organization(mut self, organization: Organization) -> Self {
        self.organization = Some(organization);
        self
    }

    /// Attach the membership.
    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.user = Some(membership.user_id);
        self.membership = Some(membership);
        self
    }

    /// Attach the invitation.
    pub fn with_invitation(mut self, invitation: Invitation) -> Self {
        self.invited_by = invitation.invited_by;
        self.invitation = Some(invitation);
        self
    }

    /// Attach the subject user.
    pub fn with_user(mut self, user: Uuid) -> Self {
        self.user = Some(user);
        self
    }

    /// Attach the removing actor.
    pub fn with_removed_by(mut self, actor: Option<Uuid>) -> Self {
        self.removed_by = actor;
        self
    }

    /// Attach the role-changing actor.
    pub fn with_changed_by(mut self, actor: Option<Uuid>) -> Self {
        self.changed_by = actor;
        self
    }

    /// Attach old/new role for a role change.
    pub fn with_role_change(mut self, old: RoleId, new: RoleId) -> Self {
        self.old_role = Some(old);
        self.new_role = Some(new);
        self
    }

    /// Attach old/new owner for a transfer.
    pub fn with_owner_change(mut self, old: Uuid, new: Uuid) -> Self {
        self.old_owner = Some(old);
        self.new_owner = Some(new);
        self
    }

    /// Attach the permission that gated the operation.
    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permission = Some(permission);
        self
    }

    /// Attach the minimum role required of the target.
    pub fn with_required_role(mut self, role: RoleId) -> Self {
        self.required_role = Some(role);
        self
    }
}

/// A registered hook. Returns `Err` to veto in strict mode.
pub type HookFn = dyn Fn(&HookContext) -> OrgResult<()> + Send + Sync;

/// Registry of strict and lenient hooks per event.
///
/// Registration happens at startup; the engine then holds the registry
/// behind an `Arc` and dispatches strict before each write and lenient after
/// each commit.
///
/// # Example
///
/// ```
/// use orgkit_org::hooks::{HookEvent, HookRegistry};
/// use orgkit_org::OrgError;
///
/// let mut hooks = HookRegistry::new();
/// hooks.on_strict(HookEvent::MemberInvited, |ctx| {
///     if ctx.invitation.is_some() {
///         Ok(())
///     } else {
///         Err(OrgError::Policy("invitation candidate missing".into()))
///     }
/// });
/// hooks.on_lenient(HookEvent::MemberJoined, |_ctx| Ok(()));
/// ```
#[derive(Default)]
pub struct HookRegistry {
    strict: HashMap<HookEvent, Vec<Arc<HookFn>>>,
    lenient: HashMap<HookEvent, Vec<Arc<HookFn>>>,
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("strict", &self.strict.len())
            .field("lenient", &self.lenient.len())
            .finish()
    }
}

impl HookRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strict (pre-commit, vetoable) hook for an event.
    pub fn on_strict<F>(&mut self, event: HookEvent, hook: F)
    where
        F: Fn(&HookContext) -> OrgResult<()> + Send + Sync + 'static,
    {
        self.strict.entry(event).or_default().push(Arc::new(hook));
    }

    /// Register a lenient (post-commit, best-effort) hook for an event.
    pub fn on_lenient<F>(&mut self, event: HookEvent, hook: F)
    where
        F: Fn(&HookContext) -> OrgResult<()> + Send + Sync + 'static,
    {
        self.lenient.entry(event).or_default().push(Arc::new(hook));
    }

    /// Dispatch strict hooks for the context's event.
    ///
    /// The first hook error propagates verbatim; the caller must not persist
    /// anything when this returns `Err`.
    pub fn dispatch_strict(&self, ctx: &HookContext) -> OrgResult<()> {
        if let Some(hooks) = self.strict.get(&ctx.event) {
            for hook in hooks {
                hook(ctx)?;
            }
        }
        Ok(())
    }

    /// Dispatch lenient hooks for the context's event.
    ///
    /// Hook errors are logged and swallowed; the committed change stands.
    pub fn dispatch_lenient(&self, ctx: &HookContext) {
        if let Some(hooks) = self.lenient.get(&ctx.event) {
            for hook in hooks {
                if let Err(e) = hook(ctx) {
                    tracing::warn!(
                        event = ctx.event.as_str(),
                        error = %e,
                        "lenient hook failed"
                    );
                }
            }
        }
    }
}
