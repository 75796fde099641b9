//! User deletion guard
//!
//! A user may not be deleted while they own any organization. The check runs
//! against membership state *before* any cascading cleanup; if the cascade
//! ran first, the guard would observe zero owner memberships and approve a
//! delete that leaves an organization ownerless.

use tracing::info;
use uuid::Uuid;

use crate::error::{OrgError, OrgResult};
use crate::hooks::{HookContext, HookEvent};
use crate::store::Directory;

use super::OrgEngine;

impl<D: Directory> OrgEngine<D> {
    /// Check whether a user could currently be deleted.
    ///
    /// # Errors
    ///
    /// [`OrgError::CannotDeleteOwner`] while the user owns at least one
    /// organization; the error carries the owned count so callers can render
    /// a meaningful message.
    pub async fn ensure_user_deletable(&self, user: Uuid) -> OrgResult<()> {
        let owned = self
            .store
            .memberships_for_user(user)
            .await?
            .iter()
            .filter(|m| m.is_owner())
            .count();
        if owned > 0 {
            return Err(OrgError::CannotDeleteOwner { user, owned });
        }
        Ok(())
    }

    /// Delete a user, cascading their memberships.
    ///
    /// The owner guard runs first, on pre-cascade state, under the user's
    /// lock. Ownership transfers take the target's user lock, so the guard's
    /// verdict stays valid for the whole cascade and a failed delete removes
    /// nothing. Only after the guard passes are the user's memberships
    /// removed (one organization lock at a time, dispatching lenient
    /// `member_removed` for each) and the user row dropped.
    ///
    /// # Errors
    ///
    /// - [`OrgError::UserNotFound`] for an unknown user
    /// - [`OrgError::CannotDeleteOwner`] while any owner membership exists
    pub async fn delete_user(&self, user: Uuid) -> OrgResult<()> {
        self.require_user(user).await?;

        // User lock before organization locks, matching the transfer path.
        let _user_guard = self.user_locks.acquire(user).await;
        self.ensure_user_deletable(user).await?;

        for membership in self.store.memberships_for_user(user).await? {
            let organization = membership.organization_id;
            let _guard = self.locks.acquire(organization).await;

            // Re-read under the lock; the row may have been removed since
            // the listing.
            let Some(current) = self.store.membership(organization, user).await? else {
                continue;
            };
            if current.is_owner() {
                // Unreachable through engine operations while the user lock
                // is held; an out-of-band owner row still must not be
                // removed.
                return Err(OrgError::CannotDeleteOwner { user, owned: 1 });
            }

            self.store.remove_membership(organization, user).await?;

            let ctx = HookContext::new(HookEvent::MemberRemoved).with_membership(current);
            self.hooks.dispatch_lenient(&ctx);
        }

        self.store.remove_user(user).await?;
        info!(user = %user, "user deleted");
        Ok(())
    }
}
