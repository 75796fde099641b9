//! Membership invariant engine
//!
//! Owns the add/remove/change-role/transfer-ownership operations and enforces
//! the single-owner invariant. Every mutating operation:
//!
//! 1. validates roles and authorization against the [`RoleRegistry`]
//! 2. acquires the exclusive per-organization lock
//! 3. re-reads invariant-relevant state under the lock
//! 4. dispatches strict hooks on the in-memory candidate (a veto aborts
//!    before any write)
//! 5. writes, translating store constraint races into idempotent outcomes
//! 6. dispatches lenient hooks after the write
//!
//! Idempotent conditions (already-a-member, same-role change, transfer to the
//! current owner, remove-a-non-member) succeed and return current state.

pub mod guard;
pub mod invitations;

use std::sync::Arc;

use orgkit_rbac::{RoleId, RoleRegistry};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{OrgError, OrgResult};
use crate::hooks::{HookContext, HookEvent, HookRegistry};
use crate::locks::LockManager;
use crate::membership::Membership;
use crate::organization::Organization;
use crate::store::{Constraint, Directory, StoreError};
use crate::user::UserAccount;

/// The membership invariant engine and invitation lifecycle manager.
///
/// Generic over the backing [`Directory`] so hosts can plug in their own
/// store; the bundled [`MemoryDirectory`](crate::store::MemoryDirectory)
/// serves tests and single-process embedding.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use orgkit_org::{MemoryDirectory, OrgEngine, UserAccount};
///
/// # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), orgkit_org::OrgError> {
/// let engine = OrgEngine::new(Arc::new(MemoryDirectory::new()));
/// let ada = UserAccount::new("ada@example.com");
/// engine.register_user(&ada).await?;
///
/// let (org, owner) = engine.create_organization(ada.id, "Acme Corp").await?;
/// assert!(owner.is_owner());
/// assert_eq!(org.name, "Acme Corp");
/// # Ok(()) }
/// ```
#[derive(Debug)]
pub struct OrgEngine<D: Directory> {
    pub(crate) store: Arc<D>,
    pub(crate) registry: RoleRegistry,
    pub(crate) hooks: Arc<HookRegistry>,
    pub(crate) config: EngineConfig,
    pub(crate) locks: LockManager,
    // Serializes the operations that can mint or guard an owner membership
    // for one user: create_organization, transfer targets, delete_user.
    // Lock order: user lock before organization lock, everywhere.
    pub(crate) user_locks: LockManager,
}

impl<D: Directory> OrgEngine<D> {
    /// Create an engine with the built-in role hierarchy, no hooks, and
    /// default configuration.
    pub fn new(store: Arc<D>) -> Self {
        Self {
            store,
            registry: RoleRegistry::default(),
            hooks: Arc::new(HookRegistry::new()),
            config: EngineConfig::default(),
            locks: LockManager::new(),
            user_locks: LockManager::new(),
        }
    }

    /// Use a shared role registry (e.g. one reconfigured by the host).
    pub fn with_registry(mut self, registry: RoleRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Install lifecycle hooks.
    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// Override the engine configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The role registry this engine consults.
    pub fn registry(&self) -> &RoleRegistry {
        &self.registry
    }

    /// Register a user account with the backing store.
    ///
    /// Identity lives with the host; the engine only needs the id/email
    /// projection for invitation matching and the deletion guard.
    pub async fn register_user(&self, user: &UserAccount) -> OrgResult<()> {
        self.store.insert_user(user).await?;
        Ok(())
    }

    // --- lookups ---

    /// Fetch an organization.
    pub async fn organization(&self, id: Uuid) -> OrgResult<Option<Organization>> {
        Ok(self.store.organization(id).await?)
    }

    /// Fetch a user's membership in an organization.
    pub async fn membership(&self, organization: Uuid, user: Uuid) -> OrgResult<Option<Membership>> {
        Ok(self.store.membership(organization, user).await?)
    }

    /// All memberships of an organization.
    pub async fn members_of(&self, organization: Uuid) -> OrgResult<Vec<Membership>> {
        Ok(self.store.members_of(organization).await?)
    }

    /// The organization's owner membership, if any.
    pub async fn owner_of(&self, organization: Uuid) -> OrgResult<Option<Membership>> {
        Ok(self.store.owner_of(organization).await?)
    }

    // --- operations ---

    /// Create an organization owned by `owner`.
    ///
    /// The owner membership is the one place the `owner` role is assigned
    /// outside an ownership transfer.
    ///
    /// # Errors
    ///
    /// - [`OrgError::UserNotFound`] if the owner is not registered
    /// - [`OrgError::InvalidOrganizationName`] for a blank name
    /// - [`OrgError::TooManyOwnedOrganizations`] past the configured limit
    /// - any strict `organization_created` hook veto
    pub async fn create_organization(
        &self,
        owner: Uuid,
        name: &str,
    ) -> OrgResult<(Organization, Membership)> {
        self.require_user(owner).await?;
        if name.trim().is_empty() {
            return Err(OrgError::InvalidOrganizationName);
        }

        // The owned-count check and the insert must be atomic with respect
        // to other create_organization calls for the same user.
        let _user_guard = self.user_locks.acquire(owner).await;

        if let Some(limit) = self.config.max_owned_organizations {
            let owned = self
                .store
                .memberships_for_user(owner)
                .await?
                .iter()
                .filter(|m| m.is_owner())
                .count();
            if owned as u32 >= limit {
                return Err(OrgError::TooManyOwnedOrganizations { user: owner, limit });
            }
        }

        let organization = Organization::new(name);
        let membership = Membership::new(organization.id, owner, RoleId::OWNER);

        let ctx = HookContext::new(HookEvent::OrganizationCreated)
            .with_organization(organization.clone())
            .with_membership(membership.clone());
        self.hooks.dispatch_strict(&ctx)?;

        self.store.insert_organization(&organization).await?;
        self.store.insert_membership(&membership).await?;

        info!(organization = %organization.id, owner = %owner, "organization created");
        self.hooks.dispatch_lenient(&ctx);

        Ok((organization, membership))
    }

    /// Add a member to an organization.
    ///
    /// Idempotent: if the user is already a member, the existing membership
    /// is returned unchanged (invitation-acceptance races rely on this).
    ///
    /// # Errors
    ///
    /// - [`OrgError::CannotHaveMultipleOwners`] if `role` is `owner`
    /// - [`OrgError::OrganizationNotFound`] / [`OrgError::UserNotFound`]
    /// - any strict `member_joined` hook veto
    pub async fn add_member(
        &self,
        organization: Uuid,
        user: Uuid,
        role: RoleId,
        invited_by: Option<Uuid>,
    ) -> OrgResult<Membership> {
        let org = self.require_organization(organization).await?;
        self.require_user(user).await?;
        self.ensure_grantable(organization, &role)?;

        let _guard = self.locks.acquire(organization).await;
        self.add_member_locked(&org, user, role, invited_by).await
    }

    /// Membership creation body, assuming the organization lock is held.
    pub(crate) async fn add_member_locked(
        &self,
        org: &Organization,
        user: Uuid,
        role: RoleId,
        invited_by: Option<Uuid>,
    ) -> OrgResult<Membership> {
        if let Some(existing) = self.store.membership(org.id, user).await? {
            debug!(organization = %org.id, user = %user, "already a member");
            return Ok(existing);
        }

        let mut candidate = Membership::new(org.id, user, role);
        if let Some(inviter) = invited_by {
            candidate = candidate.with_inviter(inviter);
        }

        let ctx = HookContext::new(HookEvent::MemberJoined)
            .with_organization(org.clone())
            .with_membership(candidate.clone());
        self.hooks.dispatch_strict(&ctx)?;

        match self.store.insert_membership(&candidate).await {
            Ok(()) => {}
            // A racing insert that slipped past the check above wins;
            // return its row rather than surfacing the constraint.
            Err(StoreError::UniqueViolation(Constraint::MembershipUserOrg)) => {
                if let Some(existing) = self.store.membership(org.id, user).await? {
                    return Ok(existing);
                }
                return Err(StoreError::NotFound("membership").into());
            }
            Err(e) => return Err(e.into()),
        }

        info!(organization = %org.id, user = %user, role = %candidate.role, "member joined");
        self.hooks.dispatch_lenient(&ctx);

        Ok(candidate)
    }

    /// Remove a member from an organization.
    ///
    /// Destroy-if-present: removing a user who is not a member is a no-op
    /// success returning `None`, so two concurrent removals never error.
    ///
    /// # Errors
    ///
    /// [`OrgError::CannotRemoveOwner`] if the target is the current owner;
    /// ownership must be transferred first.
    pub async fn remove_member(
        &self,
        organization: Uuid,
        user: Uuid,
        removed_by: Option<Uuid>,
    ) -> OrgResult<Option<Membership>> {
        let org = self.require_organization(organization).await?;

        let _guard = self.locks.acquire(organization).await;

        let Some(membership) = self.store.membership(organization, user).await? else {
            return Ok(None);
        };
        if membership.is_owner() {
            return Err(OrgError::CannotRemoveOwner { organization, user });
        }

        let ctx = HookContext::new(HookEvent::MemberRemoved)
            .with_organization(org)
            .with_membership(membership.clone())
            .with_removed_by(removed_by);
        self.hooks.dispatch_strict(&ctx)?;

        let removed = self.store.remove_membership(organization, user).await?;

        info!(organization = %organization, user = %user, "member removed");
        self.hooks.dispatch_lenient(&ctx);

        Ok(removed)
    }

    /// Change a member's role.
    ///
    /// Changing to the role already held is a no-op success.
    ///
    /// # Errors
    ///
    /// - [`OrgError::CannotHaveMultipleOwners`] if the target role is `owner`
    /// - [`OrgError::CannotDemoteOwner`] if the target user is the owner
    /// - [`OrgError::NotAMember`] if the user holds no membership
    pub async fn change_role_of(
        &self,
        organization: Uuid,
        user: Uuid,
        to: RoleId,
        changed_by: Option<Uuid>,
    ) -> OrgResult<Membership> {
        let org = self.require_organization(organization).await?;
        self.ensure_grantable(organization, &to)?;

        let _guard = self.locks.acquire(organization).await;

        let membership = self
            .store
            .membership(organization, user)
            .await?
            .ok_or(OrgError::NotAMember { organization, user })?;

        if membership.role == to {
            return Ok(membership);
        }
        if membership.is_owner() {
            return Err(OrgError::CannotDemoteOwner { organization, user });
        }

        self.apply_role_change(&org, membership, to, changed_by).await
    }

    /// Promote a member to a higher-ranked role.
    ///
    /// Direction-checked: the target role's rank must not be below the
    /// current role's rank. Promoting to the role already held is a no-op.
    ///
    /// # Errors
    ///
    /// - [`OrgError::CannotPromoteToOwner`] if the target role is `owner`
    /// - [`OrgError::CannotDemoteOwner`] if the user is the current owner
    /// - [`OrgError::InvalidRoleChange`] for a downward "promotion"
    pub async fn promote_to(
        &self,
        organization: Uuid,
        user: Uuid,
        to: RoleId,
        changed_by: Option<Uuid>,
    ) -> OrgResult<Membership> {
        self.directed_role_change(organization, user, to, changed_by, Direction::Up)
            .await
    }

    /// Demote a member to a lower-ranked role.
    ///
    /// Mirror of [`promote_to`](Self::promote_to); rejects upward
    /// "demotions" with [`OrgError::InvalidRoleChange`].
    pub async fn demote_to(
        &self,
        organization: Uuid,
        user: Uuid,
        to: RoleId,
        changed_by: Option<Uuid>,
    ) -> OrgResult<Membership> {
        self.directed_role_change(organization, user, to, changed_by, Direction::Down)
            .await
    }

    /// Transfer ownership to another member.
    ///
    /// Transferring to the current owner is a no-op success. On success the
    /// old owner is demoted to the owner role's hierarchy parent (admin in
    /// the built-in hierarchy) and the target promoted to owner.
    ///
    /// # Errors
    ///
    /// - [`OrgError::NoOwnerPresent`] if no owner membership exists
    ///   (corrupted state, surfaced as a named error)
    /// - [`OrgError::CannotTransferToNonMember`] if the target is not a member
    /// - [`OrgError::CannotTransferToNonAdmin`] if the target ranks below the
    ///   admin-equivalent role
    pub async fn transfer_ownership_to(
        &self,
        organization: Uuid,
        new_owner: Uuid,
    ) -> OrgResult<(Membership, Membership)> {
        let org = self.require_organization(organization).await?;

        // Holding the target's user lock keeps the deletion guard's verdict
        // valid: a user cannot gain ownership while delete_user walks their
        // memberships.
        let _user_guard = self.user_locks.acquire(new_owner).await;
        let _guard = self.locks.acquire(organization).await;

        let owner = self
            .store
            .owner_of(organization)
            .await?
            .ok_or(OrgError::NoOwnerPresent { organization })?;

        if owner.user_id == new_owner {
            return Ok((owner.clone(), owner));
        }

        let target = self
            .store
            .membership(organization, new_owner)
            .await?
            .ok_or(OrgError::CannotTransferToNonMember {
                organization,
                user: new_owner,
            })?;

        // One snapshot so every rank comparison sees the same hierarchy.
        let hierarchy = self.registry.snapshot();
        let demoted_role = hierarchy
            .parent_of(&RoleId::OWNER)
            .cloned()
            .ok_or(orgkit_rbac::RoleConfigError::OwnerWithoutParent)?;
        let admin_rank = hierarchy
            .rank_of(&demoted_role)
            .ok_or_else(|| orgkit_rbac::RoleConfigError::UnknownRole(demoted_role.clone()))?;
        let target_rank = hierarchy
            .rank_of(&target.role)
            .ok_or_else(|| orgkit_rbac::RoleConfigError::UnknownRole(target.role.clone()))?;
        if target_rank < admin_rank {
            return Err(OrgError::CannotTransferToNonAdmin {
                organization,
                user: new_owner,
            });
        }

        let now = chrono::Utc::now();
        let mut demoted = owner.clone();
        demoted.role = demoted_role;
        demoted.updated_at = now;
        let mut promoted = target;
        promoted.role = RoleId::OWNER;
        promoted.updated_at = now;

        let ctx = HookContext::new(HookEvent::OwnershipTransferred)
            .with_organization(org)
            .with_owner_change(owner.user_id, new_owner)
            .with_required_role(demoted.role.clone());
        self.hooks.dispatch_strict(&ctx)?;

        self.store.update_membership(&demoted).await?;
        self.store.update_membership(&promoted).await?;

        info!(
            organization = %organization,
            old_owner = %owner.user_id,
            new_owner = %new_owner,
            "ownership transferred"
        );
        self.hooks.dispatch_lenient(&ctx);

        Ok((demoted, promoted))
    }

    // --- shared guards ---

    /// Single source of truth for "may this role be assigned here?":
    /// the role must exist in the active hierarchy and must not be `owner`.
    fn ensure_grantable(&self, organization: Uuid, role: &RoleId) -> OrgResult<()> {
        self.ensure_known_role(role)?;
        if role.is_owner() {
            return Err(OrgError::CannotHaveMultipleOwners { organization });
        }
        Ok(())
    }

    pub(crate) fn ensure_known_role(&self, role: &RoleId) -> OrgResult<()> {
        if self.registry.valid_role(role) {
            Ok(())
        } else {
            Err(orgkit_rbac::RoleConfigError::UnknownRole(role.clone()).into())
        }
    }

    pub(crate) async fn require_organization(&self, id: Uuid) -> OrgResult<Organization> {
        self.store
            .organization(id)
            .await?
            .ok_or(OrgError::OrganizationNotFound(id))
    }

    pub(crate) async fn require_user(&self, id: Uuid) -> OrgResult<UserAccount> {
        self.store.user(id).await?.ok_or(OrgError::UserNotFound(id))
    }

    async fn directed_role_change(
        &self,
        organization: Uuid,
        user: Uuid,
        to: RoleId,
        changed_by: Option<Uuid>,
        direction: Direction,
    ) -> OrgResult<Membership> {
        let org = self.require_organization(organization).await?;
        self.ensure_known_role(&to)?;
        if to.is_owner() {
            return Err(OrgError::CannotPromoteToOwner { organization, user });
        }

        let _guard = self.locks.acquire(organization).await;

        let membership = self
            .store
            .membership(organization, user)
            .await?
            .ok_or(OrgError::NotAMember { organization, user })?;

        if membership.is_owner() {
            return Err(OrgError::CannotDemoteOwner { organization, user });
        }
        if membership.role == to {
            return Ok(membership);
        }

        let hierarchy = self.registry.snapshot();
        let from_rank = hierarchy
            .rank_of(&membership.role)
            .ok_or_else(|| orgkit_rbac::RoleConfigError::UnknownRole(membership.role.clone()))?;
        let to_rank = hierarchy
            .rank_of(&to)
            .ok_or_else(|| orgkit_rbac::RoleConfigError::UnknownRole(to.clone()))?;
        let wrong_direction = match direction {
            Direction::Up => to_rank < from_rank,
            Direction::Down => to_rank > from_rank,
        };
        if wrong_direction {
            return Err(OrgError::InvalidRoleChange {
                from: membership.role,
                to,
            });
        }

        self.apply_role_change(&org, membership, to, changed_by).await
    }

    /// Role-change body, assuming the organization lock is held and all
    /// direction/owner checks are done.
    async fn apply_role_change(
        &self,
        org: &Organization,
        membership: Membership,
        to: RoleId,
        changed_by: Option<Uuid>,
    ) -> OrgResult<Membership> {
        let old_role = membership.role.clone();
        let mut updated = membership;
        updated.role = to.clone();
        updated.updated_at = chrono::Utc::now();

        let ctx = HookContext::new(HookEvent::RoleChanged)
            .with_organization(org.clone())
            .with_membership(updated.clone())
            .with_changed_by(changed_by)
            .with_role_change(old_role.clone(), to.clone());
        self.hooks.dispatch_strict(&ctx)?;

        self.store.update_membership(&updated).await?;

        info!(
            organization = %org.id,
            user = %updated.user_id,
            old_role = %old_role,
            new_role = %to,
            "role changed"
        );
        self.hooks.dispatch_lenient(&ctx);

        Ok(updated)
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
}
