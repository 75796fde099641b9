//! In-memory reference store
//!
//! Suitable for tests and single-process embedding. Enforces the same
//! uniqueness constraints a SQL deployment would carry, so engine race
//! translation paths behave identically against it.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::invitation::Invitation;
use crate::membership::Membership;
use crate::organization::Organization;
use crate::user::UserAccount;

use super::{
    Constraint, InvitationStore, MembershipStore, OrganizationStore, StoreError, StoreResult,
    UserStore,
};

#[derive(Debug, Default)]
struct State {
    organizations: HashMap<Uuid, Organization>,
    memberships: HashMap<(Uuid, Uuid), Membership>,
    invitations: HashMap<Uuid, Invitation>,
    users: HashMap<Uuid, UserAccount>,
}

/// In-memory [`Directory`](super::Directory) implementation.
///
/// All rows live in process memory behind a single async `RwLock`. Writes
/// validate the three store constraints and report violations exactly as a
/// constrained SQL store would.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<State>,
}

impl MemoryDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrganizationStore for MemoryDirectory {
    async fn insert_organization(&self, organization: &Organization) -> StoreResult<()> {
        let mut state = self.state.write().await;
        state
            .organizations
            .insert(organization.id, organization.clone());
        Ok(())
    }

    async fn organization(&self, id: Uuid) -> StoreResult<Option<Organization>> {
        Ok(self.state.read().await.organizations.get(&id).cloned())
    }
}

#[async_trait]
impl MembershipStore for MemoryDirectory {
    async fn insert_membership(&self, membership: &Membership) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = (membership.organization_id, membership.user_id);
        if state.memberships.contains_key(&key) {
            return Err(StoreError::UniqueViolation(Constraint::MembershipUserOrg));
        }
        state.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn membership(&self, organization: Uuid, user: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .get(&(organization, user))
            .cloned())
    }

    async fn update_membership(&self, membership: &Membership) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let key = (membership.organization_id, membership.user_id);
        if !state.memberships.contains_key(&key) {
            return Err(StoreError::NotFound("membership"));
        }
        state.memberships.insert(key, membership.clone());
        Ok(())
    }

    async fn remove_membership(
        &self,
        organization: Uuid,
        user: Uuid,
    ) -> StoreResult<Option<Membership>> {
        Ok(self
            .state
            .write()
            .await
            .memberships
            .remove(&(organization, user)))
    }

    async fn members_of(&self, organization: Uuid) -> StoreResult<Vec<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .values()
            .filter(|m| m.organization_id == organization)
            .cloned()
            .collect())
    }

    async fn owner_of(&self, organization: Uuid) -> StoreResult<Option<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .values()
            .find(|m| m.organization_id == organization && m.is_owner())
            .cloned())
    }

    async fn memberships_for_user(&self, user: Uuid) -> StoreResult<Vec<Membership>> {
        Ok(self
            .state
            .read()
            .await
            .memberships
            .values()
            .filter(|m| m.user_id == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl InvitationStore for MemoryDirectory {
    async fn insert_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if state
            .invitations
            .values()
            .any(|i| i.token == invitation.token)
        {
            return Err(StoreError::UniqueViolation(Constraint::InvitationToken));
        }
        let email = invitation.email_normalized();
        if state.invitations.values().any(|i| {
            i.organization_id == invitation.organization_id
                && i.accepted_at.is_none()
                && i.email_normalized() == email
        }) {
            return Err(StoreError::UniqueViolation(
                Constraint::InvitationPendingEmail,
            ));
        }
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn invitation(&self, id: Uuid) -> StoreResult<Option<Invitation>> {
        Ok(self.state.read().await.invitations.get(&id).cloned())
    }

    async fn invitation_by_token(&self, token: &str) -> StoreResult<Option<Invitation>> {
        Ok(self
            .state
            .read()
            .await
            .invitations
            .values()
            .find(|i| i.token == token)
            .cloned())
    }

    async fn update_invitation(&self, invitation: &Invitation) -> StoreResult<()> {
        let mut state = self.state.write().await;
        if !state.invitations.contains_key(&invitation.id) {
            return Err(StoreError::NotFound("invitation"));
        }
        if state
            .invitations
            .values()
            .any(|i| i.id != invitation.id && i.token == invitation.token)
        {
            return Err(StoreError::UniqueViolation(Constraint::InvitationToken));
        }
        state.invitations.insert(invitation.id, invitation.clone());
        Ok(())
    }

    async fn open_invitation(
        &self,
        organization: Uuid,
        email_lower: &str,
    ) -> StoreResult<Option<Invitation>> {
        Ok(self
            .state
            .read()
            .await
            .invitations
            .values()
            .find(|i| {
                i.organization_id == organization
                    && i.accepted_at.is_none()
                    && i.email_normalized() == email_lower
            })
            .cloned())
    }

    async fn invitations_for_email(&self, email_lower: &str) -> StoreResult<Vec<Invitation>> {
        Ok(self
            .state
            .read()
            .await
            .invitations
            .values()
            .filter(|i| i.email_normalized() == email_lower)
            .cloned()
            .collect())
    }

    async fn token_exists(&self, token: &str) -> StoreResult<bool> {
        Ok(self
            .state
            .read()
            .await
            .invitations
            .values()
            .any(|i| i.token == token))
    }
}

#[async_trait]
impl UserStore for MemoryDirectory {
    async fn insert_user(&self, user: &UserAccount) -> StoreResult<()> {
        self.state.write().await.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn user(&self, id: Uuid) -> StoreResult<Option<UserAccount>> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn user_by_email(&self, email_lower: &str) -> StoreResult<Option<UserAccount>> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|u| u.email_normalized() == email_lower)
            .cloned())
    }

    async fn remove_user(&self, id: Uuid) -> StoreResult<Option<UserAccount>> {
        Ok(self.state.write().await.users.remove(&id))
    }
}
