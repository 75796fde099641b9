//! Invitation lifecycle
//!
//! State machine: `pending → accepted` (terminal) or `pending → expired →
//! pending` (via resend, which regenerates the token and expiry in place;
//! an expired invitation is a live record, never deleted).
//!
//! Creation and acceptance run under the organization lock, so two callers
//! racing on the same email or token observe each other's committed state
//! and resolve idempotently instead of duplicating rows or memberships.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use orgkit_rbac::{Permission, RoleId};
use rand::RngCore;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{OrgError, OrgResult};
use crate::hooks::{HookContext, HookEvent};
use crate::invitation::Invitation;
use crate::membership::Membership;
use crate::store::{Constraint, Directory, StoreError};
use crate::user::UserAccount;

use super::OrgEngine;

/// Random bytes per token; 32 bytes of OS entropy, URL-safe encoded.
const TOKEN_BYTES: usize = 32;

/// Collision retries before giving up. Collisions are astronomically rare;
/// this bound exists so a broken store cannot spin the loop forever.
const TOKEN_ATTEMPTS: usize = 64;

impl<D: Directory> OrgEngine<D> {
    /// Create an invitation to join an organization.
    ///
    /// `role` defaults to the configured default invitation role. If an open
    /// (non-accepted) invitation already exists for the same organization and
    /// email, it is returned unchanged, unless it has expired, in which case
    /// it is refreshed in place (new token, new expiry, same row) rather than
    /// duplicated.
    ///
    /// The strict `member_invited` hook fires on the in-memory candidate
    /// before persistence, for fresh rows and expired-row refreshes alike;
    /// a veto means no row written and no token consumed.
    ///
    /// # Errors
    ///
    /// - [`OrgError::NotAMember`] if `invited_by` holds no membership
    /// - [`OrgError::NotAuthorized`] without the `invite_members` permission
    /// - [`OrgError::CannotInviteAsOwner`] for the `owner` role
    /// - [`OrgError::AlreadyAMember`] if the email belongs to a member
    pub async fn create_invitation(
        &self,
        organization: Uuid,
        email: &str,
        role: Option<RoleId>,
        invited_by: Uuid,
    ) -> OrgResult<Invitation> {
        let org = self.require_organization(organization).await?;

        let inviter = self
            .store
            .membership(organization, invited_by)
            .await?
            .ok_or(OrgError::NotAMember {
                organization,
                user: invited_by,
            })?;
        if !self
            .registry
            .has_permission(&inviter.role, &Permission::INVITE_MEMBERS)
        {
            return Err(OrgError::NotAuthorized {
                organization,
                user: invited_by,
                permission: Permission::INVITE_MEMBERS,
            });
        }

        let role = role.unwrap_or_else(|| self.config.default_invitation_role.clone());
        self.ensure_known_role(&role)?;
        if role.is_owner() {
            return Err(OrgError::CannotInviteAsOwner { organization });
        }

        let _guard = self.locks.acquire(organization).await;

        let email_lower = email.to_lowercase();
        if let Some(user) = self.store.user_by_email(&email_lower).await? {
            if self.store.membership(organization, user.id).await?.is_some() {
                return Err(OrgError::AlreadyAMember {
                    organization,
                    email: email.to_string(),
                });
            }
        }

        if let Some(existing) = self.store.open_invitation(organization, &email_lower).await? {
            if !existing.is_expired() {
                debug!(organization = %organization, invitation = %existing.id, "re-invite returns open invitation");
                return Ok(existing);
            }
            // Refresh the expired row in place: same identity, new token and
            // expiry, back to pending. A refresh is a creation as far as
            // strict hooks are concerned, so a veto leaves the row untouched.
            let mut refreshed = existing;
            refreshed.token = self.generate_token().await?;
            let now = chrono::Utc::now();
            refreshed.expires_at = self.config.invitation_expires_at(now);
            refreshed.updated_at = now;

            let ctx = HookContext::new(HookEvent::MemberInvited)
                .with_organization(org)
                .with_invitation(refreshed.clone())
                .with_permission(Permission::INVITE_MEMBERS);
            self.hooks.dispatch_strict(&ctx)?;

            loop {
                match self.store.update_invitation(&refreshed).await {
                    Ok(()) => break,
                    Err(StoreError::UniqueViolation(Constraint::InvitationToken)) => {
                        refreshed.token = self.generate_token().await?;
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            info!(organization = %organization, invitation = %refreshed.id, "expired invitation refreshed");
            self.hooks.dispatch_lenient(&ctx);
            return Ok(refreshed);
        }

        let now = chrono::Utc::now();
        let candidate = Invitation::new(
            organization,
            email,
            role,
            self.generate_token().await?,
            Some(invited_by),
        )
        .expires_at(self.config.invitation_expires_at(now));

        let ctx = HookContext::new(HookEvent::MemberInvited)
            .with_organization(org)
            .with_invitation(candidate.clone())
            .with_permission(Permission::INVITE_MEMBERS);
        self.hooks.dispatch_strict(&ctx)?;

        let mut candidate = candidate;
        loop {
            match self.store.insert_invitation(&candidate).await {
                Ok(()) => break,
                // A racing creation for the same email won; return its row.
                Err(StoreError::UniqueViolation(Constraint::InvitationPendingEmail)) => {
                    if let Some(winner) =
                        self.store.open_invitation(organization, &email_lower).await?
                    {
                        return Ok(winner);
                    }
                    return Err(StoreError::NotFound("invitation").into());
                }
                // Token collision at the constraint: regenerate and retry.
                Err(StoreError::UniqueViolation(Constraint::InvitationToken)) => {
                    candidate.token = self.generate_token().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(
            organization = %organization,
            invitation = %candidate.id,
            role = %candidate.role,
            "invitation created"
        );
        self.hooks.dispatch_lenient(&ctx);

        Ok(candidate)
    }

    /// Accept an invitation, materializing a membership.
    ///
    /// Acceptance is linearized per invitation via the organization lock and
    /// is idempotent: if the invitation was already accepted and the
    /// resulting membership still exists, that membership is returned
    /// unchanged. If the membership was since removed the invitation is
    /// spent; it never silently re-creates membership.
    ///
    /// `skip_email_validation` exists for administrative/out-of-band flows.
    ///
    /// # Errors
    ///
    /// - [`OrgError::EmailMismatch`] unless emails match case-insensitively
    /// - [`OrgError::CannotAcceptAsOwner`] for a tampered owner-role row
    /// - [`OrgError::InvitationAlreadyAccepted`] when spent
    /// - [`OrgError::InvitationExpired`] past expiry
    pub async fn accept_invitation(
        &self,
        invitation: Uuid,
        user: &UserAccount,
        skip_email_validation: bool,
    ) -> OrgResult<Membership> {
        let preread = self
            .store
            .invitation(invitation)
            .await?
            .ok_or(OrgError::InvitationNotFound(invitation))?;
        let org = self.require_organization(preread.organization_id).await?;
        self.require_user(user.id).await?;

        let _guard = self.locks.acquire(org.id).await;

        // Re-read under the lock; a concurrent accept may have committed.
        let inv = self
            .store
            .invitation(invitation)
            .await?
            .ok_or(OrgError::InvitationNotFound(invitation))?;

        if !skip_email_validation && !inv.email_matches(&user.email) {
            return Err(OrgError::EmailMismatch { invitation });
        }
        if inv.role.is_owner() {
            return Err(OrgError::CannotAcceptAsOwner { invitation });
        }

        if inv.is_accepted() {
            if let Some(existing) = self.store.membership(org.id, user.id).await? {
                debug!(invitation = %invitation, "accept is idempotent, membership intact");
                return Ok(existing);
            }
            return Err(OrgError::InvitationAlreadyAccepted { invitation });
        }
        if inv.is_expired() {
            return Err(OrgError::InvitationExpired { invitation });
        }

        let membership = self
            .add_member_locked(&org, user.id, inv.role.clone(), inv.invited_by)
            .await?;

        let mut accepted = inv;
        let now = chrono::Utc::now();
        accepted.accepted_at = Some(now);
        accepted.updated_at = now;
        self.store.update_invitation(&accepted).await?;

        info!(
            organization = %org.id,
            invitation = %invitation,
            user = %user.id,
            "invitation accepted"
        );

        Ok(membership)
    }

    /// Regenerate an invitation's token and expiry, leaving it pending.
    ///
    /// The strict `member_invited` hook runs on the refreshed candidate
    /// before the write; a veto leaves the stored row untouched.
    ///
    /// # Errors
    ///
    /// [`OrgError::InvitationAlreadyAccepted`] if the invitation was
    /// accepted; accepted invitations are terminal.
    pub async fn resend_invitation(&self, invitation: Uuid) -> OrgResult<Invitation> {
        let preread = self
            .store
            .invitation(invitation)
            .await?
            .ok_or(OrgError::InvitationNotFound(invitation))?;
        let org = self.require_organization(preread.organization_id).await?;

        let _guard = self.locks.acquire(org.id).await;

        let inv = self
            .store
            .invitation(invitation)
            .await?
            .ok_or(OrgError::InvitationNotFound(invitation))?;
        if inv.is_accepted() {
            return Err(OrgError::InvitationAlreadyAccepted { invitation });
        }

        let mut refreshed = inv;
        let now = chrono::Utc::now();
        refreshed.token = self.generate_token().await?;
        refreshed.expires_at = self.config.invitation_expires_at(now);
        refreshed.updated_at = now;

        let ctx = HookContext::new(HookEvent::MemberInvited)
            .with_organization(org)
            .with_invitation(refreshed.clone());
        self.hooks.dispatch_strict(&ctx)?;

        loop {
            match self.store.update_invitation(&refreshed).await {
                Ok(()) => break,
                Err(StoreError::UniqueViolation(Constraint::InvitationToken)) => {
                    refreshed.token = self.generate_token().await?;
                }
                Err(e) => return Err(e.into()),
            }
        }

        info!(invitation = %invitation, "invitation resent");
        self.hooks.dispatch_lenient(&ctx);
        Ok(refreshed)
    }

    /// All invitations addressed to an email, case-insensitively.
    pub async fn invitations_for_email(&self, email: &str) -> OrgResult<Vec<Invitation>> {
        Ok(self
            .store
            .invitations_for_email(&email.to_lowercase())
            .await?)
    }

    /// Look up an invitation by its opaque token.
    pub async fn invitation_by_token(&self, token: &str) -> OrgResult<Option<Invitation>> {
        Ok(self.store.invitation_by_token(token).await?)
    }

    /// Generate a fresh, collision-checked, URL-safe token.
    ///
    /// Retries against the store's existence check; the bound is generous
    /// because a collision of 256-bit tokens is not a normal code path.
    async fn generate_token(&self) -> OrgResult<String> {
        for _ in 0..TOKEN_ATTEMPTS {
            let mut bytes = [0u8; TOKEN_BYTES];
            rand::thread_rng().fill_bytes(&mut bytes);
            let token = URL_SAFE_NO_PAD.encode(bytes);
            if !self.store.token_exists(&token).await? {
                return Ok(token);
            }
        }
        Err(OrgError::TokenGeneration)
    }
}
