//! End-to-end lifecycle tests against the in-memory store.

use std::sync::Arc;

use chrono::{Duration, Utc};
use orgkit_org::store::InvitationStore;
use orgkit_org::{
    EngineConfig, HookEvent, HookRegistry, Invitation, InvitationStatus, MemoryDirectory,
    OrgEngine, OrgError, UserAccount,
};
use orgkit_rbac::{Permission, RoleId};

struct Fixture {
    store: Arc<MemoryDirectory>,
    engine: OrgEngine<MemoryDirectory>,
    ada: UserAccount,
    grace: UserAccount,
    linus: UserAccount,
}

async fn fixture() -> Fixture {
    fixture_with(|engine| engine).await
}

async fn fixture_with(
    customize: impl FnOnce(OrgEngine<MemoryDirectory>) -> OrgEngine<MemoryDirectory>,
) -> Fixture {
    let store = Arc::new(MemoryDirectory::new());
    let engine = customize(OrgEngine::new(store.clone()));
    let ada = UserAccount::new("ada@example.com");
    let grace = UserAccount::new("grace@example.com");
    let linus = UserAccount::new("linus@example.com");
    for user in [&ada, &grace, &linus] {
        engine.register_user(user).await.unwrap();
    }
    Fixture {
        store,
        engine,
        ada,
        grace,
        linus,
    }
}

async fn owner_count(engine: &OrgEngine<MemoryDirectory>, org: uuid::Uuid) -> usize {
    engine
        .members_of(org)
        .await
        .unwrap()
        .iter()
        .filter(|m| m.is_owner())
        .count()
}

// --- organization creation ---

#[tokio::test]
async fn create_organization_materializes_owner_membership() {
    let f = fixture().await;
    let (org, owner) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    assert_eq!(owner.organization_id, org.id);
    assert_eq!(owner.user_id, f.ada.id);
    assert!(owner.is_owner());
    assert_eq!(owner_count(&f.engine, org.id).await, 1);
}

#[tokio::test]
async fn create_organization_rejects_blank_name() {
    let f = fixture().await;
    let err = f.engine.create_organization(f.ada.id, "  ").await.unwrap_err();
    assert!(matches!(err, OrgError::InvalidOrganizationName));
}

#[tokio::test]
async fn create_organization_rejects_unknown_owner() {
    let f = fixture().await;
    let err = f
        .engine
        .create_organization(uuid::Uuid::now_v7(), "Acme")
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::UserNotFound(_)));
}

#[tokio::test]
async fn create_organization_enforces_owned_limit() {
    let f = fixture_with(|engine| {
        engine.with_config(EngineConfig {
            max_owned_organizations: Some(1),
            ..EngineConfig::default()
        })
    })
    .await;

    f.engine.create_organization(f.ada.id, "First").await.unwrap();
    let err = f
        .engine
        .create_organization(f.ada.id, "Second")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrgError::TooManyOwnedOrganizations { limit: 1, .. }
    ));
}

// --- add / remove ---

#[tokio::test]
async fn add_member_is_idempotent() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let first = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, Some(f.ada.id))
        .await
        .unwrap();
    let second = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::ADMIN, None)
        .await
        .unwrap();

    // The second call returns the existing membership unchanged.
    assert_eq!(first.id, second.id);
    assert_eq!(second.role, RoleId::MEMBER);
    assert_eq!(second.invited_by, Some(f.ada.id));
}

#[tokio::test]
async fn add_member_refuses_owner_role() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let err = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::OWNER, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::CannotHaveMultipleOwners { .. }));

    // Invariant intact: ada is still the only owner.
    let owner = f.engine.owner_of(org.id).await.unwrap().unwrap();
    assert_eq!(owner.user_id, f.ada.id);
    assert_eq!(owner_count(&f.engine, org.id).await, 1);
}

#[tokio::test]
async fn add_member_rejects_unknown_role() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let err = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::new("warlord"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::RoleConfig(_)));
}

#[tokio::test]
async fn remove_member_refuses_owner() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let err = f
        .engine
        .remove_member(org.id, f.ada.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::CannotRemoveOwner { .. }));
    assert_eq!(owner_count(&f.engine, org.id).await, 1);
}

#[tokio::test]
async fn remove_member_is_destroy_if_present() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();

    let removed = f
        .engine
        .remove_member(org.id, f.grace.id, Some(f.ada.id))
        .await
        .unwrap();
    assert!(removed.is_some());

    // Second removal is a no-op success, not an error.
    let again = f.engine.remove_member(org.id, f.grace.id, None).await.unwrap();
    assert!(again.is_none());
}

// --- role changes ---

#[tokio::test]
async fn change_role_same_role_is_noop() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let before = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();

    let after = f
        .engine
        .change_role_of(org.id, f.grace.id, RoleId::MEMBER, Some(f.ada.id))
        .await
        .unwrap();
    assert_eq!(before.updated_at, after.updated_at);
}

#[tokio::test]
async fn change_role_refuses_owner_paths() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();

    let to_owner = f
        .engine
        .change_role_of(org.id, f.grace.id, RoleId::OWNER, None)
        .await
        .unwrap_err();
    assert!(matches!(to_owner, OrgError::CannotHaveMultipleOwners { .. }));

    let demote_owner = f
        .engine
        .change_role_of(org.id, f.ada.id, RoleId::ADMIN, None)
        .await
        .unwrap_err();
    assert!(matches!(demote_owner, OrgError::CannotDemoteOwner { .. }));
}

#[tokio::test]
async fn change_role_rejects_non_member() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let err = f
        .engine
        .change_role_of(org.id, f.grace.id, RoleId::ADMIN, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::NotAMember { .. }));
}

#[tokio::test]
async fn promotion_and_demotion_are_direction_checked() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::VIEWER, None)
        .await
        .unwrap();

    let promoted = f
        .engine
        .promote_to(org.id, f.grace.id, RoleId::ADMIN, Some(f.ada.id))
        .await
        .unwrap();
    assert_eq!(promoted.role, RoleId::ADMIN);

    let wrong_way = f
        .engine
        .promote_to(org.id, f.grace.id, RoleId::VIEWER, None)
        .await
        .unwrap_err();
    assert!(matches!(wrong_way, OrgError::InvalidRoleChange { .. }));

    let demoted = f
        .engine
        .demote_to(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();
    assert_eq!(demoted.role, RoleId::MEMBER);

    let wrong_way = f
        .engine
        .demote_to(org.id, f.grace.id, RoleId::ADMIN, None)
        .await
        .unwrap_err();
    assert!(matches!(wrong_way, OrgError::InvalidRoleChange { .. }));

    let to_owner = f
        .engine
        .promote_to(org.id, f.grace.id, RoleId::OWNER, None)
        .await
        .unwrap_err();
    assert!(matches!(to_owner, OrgError::CannotPromoteToOwner { .. }));
}

// --- ownership transfer ---

#[tokio::test]
async fn transfer_requires_admin_ranked_member() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::VIEWER, None)
        .await
        .unwrap();

    let to_stranger = f
        .engine
        .transfer_ownership_to(org.id, f.linus.id)
        .await
        .unwrap_err();
    assert!(matches!(to_stranger, OrgError::CannotTransferToNonMember { .. }));

    let to_viewer = f
        .engine
        .transfer_ownership_to(org.id, f.grace.id)
        .await
        .unwrap_err();
    assert!(matches!(to_viewer, OrgError::CannotTransferToNonAdmin { .. }));

    // Owner unchanged after both failures.
    let owner = f.engine.owner_of(org.id).await.unwrap().unwrap();
    assert_eq!(owner.user_id, f.ada.id);
}

#[tokio::test]
async fn transfer_swaps_owner_and_demotes_to_admin() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::ADMIN, None)
        .await
        .unwrap();

    let (old_owner, new_owner) = f
        .engine
        .transfer_ownership_to(org.id, f.grace.id)
        .await
        .unwrap();

    assert_eq!(old_owner.user_id, f.ada.id);
    assert_eq!(old_owner.role, RoleId::ADMIN);
    assert_eq!(new_owner.user_id, f.grace.id);
    assert!(new_owner.is_owner());
    assert_eq!(owner_count(&f.engine, org.id).await, 1);
}

#[tokio::test]
async fn transfer_to_current_owner_is_noop() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let (old_owner, new_owner) = f
        .engine
        .transfer_ownership_to(org.id, f.ada.id)
        .await
        .unwrap();
    assert_eq!(old_owner.user_id, f.ada.id);
    assert_eq!(new_owner.user_id, f.ada.id);
    assert!(new_owner.is_owner());
}

#[tokio::test]
async fn transfer_names_corrupted_ownerless_state() {
    let f = fixture().await;
    // Corrupted state built behind the engine's back: an organization with a
    // membership but no owner row.
    use orgkit_org::store::{MembershipStore, OrganizationStore};
    let org = orgkit_org::Organization::new("Ghost Ship");
    f.store.insert_organization(&org).await.unwrap();
    let m = orgkit_org::Membership::new(org.id, f.grace.id, RoleId::ADMIN);
    f.store.insert_membership(&m).await.unwrap();

    let err = f
        .engine
        .transfer_ownership_to(org.id, f.grace.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::NoOwnerPresent { .. }));
}

// --- invitations ---

#[tokio::test]
async fn create_invitation_checks_authorization() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();

    let stranger = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.linus.id)
        .await
        .unwrap_err();
    assert!(matches!(stranger, OrgError::NotAMember { .. }));

    let err = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.grace.id)
        .await
        .unwrap_err();
    match err {
        OrgError::NotAuthorized { permission, .. } => {
            assert_eq!(permission, Permission::INVITE_MEMBERS);
        }
        other => panic!("expected NotAuthorized, got {other:?}"),
    }
    // Zero invitations were created by the rejected attempts.
    assert!(f
        .engine
        .invitations_for_email("x@example.com")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn create_invitation_refuses_owner_role_and_existing_members() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();

    let as_owner = f
        .engine
        .create_invitation(org.id, "x@example.com", Some(RoleId::OWNER), f.ada.id)
        .await
        .unwrap_err();
    assert!(matches!(as_owner, OrgError::CannotInviteAsOwner { .. }));

    // Case-insensitive existing-member check.
    let existing = f
        .engine
        .create_invitation(org.id, "GRACE@example.com", None, f.ada.id)
        .await
        .unwrap_err();
    assert!(matches!(existing, OrgError::AlreadyAMember { .. }));
}

#[tokio::test]
async fn create_invitation_is_idempotent_while_pending() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let first = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.ada.id)
        .await
        .unwrap();
    let second = f
        .engine
        .create_invitation(org.id, "X@EXAMPLE.COM", None, f.ada.id)
        .await
        .unwrap();

    assert_eq!(first.id, second.id);
    assert_eq!(first.token, second.token);
    assert_eq!(
        f.engine
            .invitations_for_email("x@example.com")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn create_invitation_refreshes_expired_row_in_place() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let original = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.ada.id)
        .await
        .unwrap();

    // Expire it a day ago, behind the engine.
    let mut expired = original.clone();
    expired.expires_at = Some(Utc::now() - Duration::days(1));
    f.store.update_invitation(&expired).await.unwrap();

    let refreshed = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.ada.id)
        .await
        .unwrap();

    assert_eq!(refreshed.id, original.id);
    assert_ne!(refreshed.token, original.token);
    assert_eq!(refreshed.status(), InvitationStatus::Pending);
    assert_eq!(
        f.engine
            .invitations_for_email("x@example.com")
            .await
            .unwrap()
            .len(),
        1
    );
}

#[tokio::test]
async fn create_invitation_uses_default_role_and_expiry() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let inv = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.ada.id)
        .await
        .unwrap();
    assert_eq!(inv.role, RoleId::MEMBER);
    let expires = inv.expires_at.unwrap();
    assert!(expires > Utc::now() + Duration::days(6));
    assert!(expires <= Utc::now() + Duration::days(7));
}

#[tokio::test]
async fn strict_hook_vetoes_invitation_before_any_write() {
    let f = fixture_with(|engine| {
        let mut hooks = HookRegistry::new();
        hooks.on_strict(HookEvent::MemberInvited, |_| {
            Err(OrgError::Policy("seat limit reached".into()))
        });
        engine.with_hooks(hooks)
    })
    .await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let err = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.ada.id)
        .await
        .unwrap_err();
    // The hook's error arrives verbatim.
    assert!(matches!(err, OrgError::Policy(ref msg) if msg == "seat limit reached"));

    // Vetoed entirely: no row.
    assert!(f
        .engine
        .invitations_for_email("x@example.com")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn strict_hook_vetoes_expired_invitation_refresh() {
    let f = fixture_with(|engine| {
        let mut hooks = HookRegistry::new();
        hooks.on_strict(HookEvent::MemberInvited, |_| {
            Err(OrgError::Policy("seat limit reached".into()))
        });
        engine.with_hooks(hooks)
    })
    .await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    // Plant an expired open row behind the engine so re-inviting takes the
    // refresh path instead of creating a fresh row.
    let planted = Invitation::new(org.id, "x@example.com", RoleId::MEMBER, "tok", Some(f.ada.id))
        .expires_at(Some(Utc::now() - Duration::days(1)));
    f.store.insert_invitation(&planted).await.unwrap();

    let err = f
        .engine
        .create_invitation(org.id, "x@example.com", None, f.ada.id)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Policy(ref msg) if msg == "seat limit reached"));

    // The veto left the stored row untouched: same token, still expired.
    let rows = f.engine.invitations_for_email("x@example.com").await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].token, "tok");
    assert_eq!(rows[0].status(), InvitationStatus::Expired);
}

#[tokio::test]
async fn strict_hook_vetoes_resend() {
    let f = fixture_with(|engine| {
        let mut hooks = HookRegistry::new();
        hooks.on_strict(HookEvent::MemberInvited, |_| {
            Err(OrgError::Policy("invites frozen".into()))
        });
        engine.with_hooks(hooks)
    })
    .await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let planted = Invitation::new(org.id, "x@example.com", RoleId::MEMBER, "tok", Some(f.ada.id));
    f.store.insert_invitation(&planted).await.unwrap();

    let err = f.engine.resend_invitation(planted.id).await.unwrap_err();
    assert!(matches!(err, OrgError::Policy(_)));

    let current = f.store.invitation(planted.id).await.unwrap().unwrap();
    assert_eq!(current.token, "tok");
}

#[tokio::test]
async fn strict_hook_vetoes_membership_creation() {
    let f = fixture_with(|engine| {
        let mut hooks = HookRegistry::new();
        hooks.on_strict(HookEvent::MemberJoined, |ctx| {
            match &ctx.membership {
                Some(m) if m.role == RoleId::VIEWER => Ok(()),
                _ => Err(OrgError::Policy("only viewers allowed".into())),
            }
        });
        engine.with_hooks(hooks)
    })
    .await;
    // Organization creation is unaffected; it dispatches organization_created.
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let err = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::Policy(_)));
    assert!(f.engine.membership(org.id, f.grace.id).await.unwrap().is_none());

    f.engine
        .add_member(org.id, f.grace.id, RoleId::VIEWER, None)
        .await
        .unwrap();
}

#[tokio::test]
async fn lenient_hook_failure_never_fails_the_operation() {
    let f = fixture_with(|engine| {
        let mut hooks = HookRegistry::new();
        hooks.on_lenient(HookEvent::MemberJoined, |_| {
            Err(OrgError::Policy("analytics backend down".into()))
        });
        engine.with_hooks(hooks)
    })
    .await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let membership = f
        .engine
        .add_member(org.id, f.grace.id, RoleId::MEMBER, None)
        .await
        .unwrap();
    assert_eq!(membership.role, RoleId::MEMBER);
}

// --- acceptance ---

#[tokio::test]
async fn accept_validates_email_unless_skipped() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "grace@example.com", None, f.ada.id)
        .await
        .unwrap();

    let err = f
        .engine
        .accept_invitation(inv.id, &f.linus, false)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::EmailMismatch { .. }));

    // Administrative flows can skip the check.
    let membership = f
        .engine
        .accept_invitation(inv.id, &f.linus, true)
        .await
        .unwrap();
    assert_eq!(membership.user_id, f.linus.id);
}

#[tokio::test]
async fn accept_matches_email_case_insensitively() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "GRACE@Example.Com", None, f.ada.id)
        .await
        .unwrap();

    let membership = f
        .engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap();
    assert_eq!(membership.user_id, f.grace.id);
    assert_eq!(membership.invited_by, Some(f.ada.id));
}

#[tokio::test]
async fn accept_is_idempotent_while_membership_exists() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "grace@example.com", None, f.ada.id)
        .await
        .unwrap();

    let first = f
        .engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap();
    let second = f
        .engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(f.engine.members_of(org.id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn accepted_invitation_is_single_use() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "grace@example.com", None, f.ada.id)
        .await
        .unwrap();
    f.engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap();
    f.engine
        .remove_member(org.id, f.grace.id, Some(f.ada.id))
        .await
        .unwrap();

    // The membership is gone; the spent invitation never re-creates it.
    let err = f
        .engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvitationAlreadyAccepted { .. }));
}

#[tokio::test]
async fn accept_rejects_expired_invitation() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "grace@example.com", None, f.ada.id)
        .await
        .unwrap();

    let mut expired = inv.clone();
    expired.expires_at = Some(Utc::now() - Duration::hours(1));
    f.store.update_invitation(&expired).await.unwrap();

    let err = f
        .engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::InvitationExpired { .. }));
    assert!(f.engine.membership(org.id, f.grace.id).await.unwrap().is_none());
}

#[tokio::test]
async fn accept_rejects_tampered_owner_role() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    // A row carrying the owner role cannot be built through the engine;
    // plant one directly to exercise the defense-in-depth check.
    let tampered = Invitation::new(org.id, "grace@example.com", RoleId::OWNER, "tok", None);
    f.store.insert_invitation(&tampered).await.unwrap();

    let err = f
        .engine
        .accept_invitation(tampered.id, &f.grace, false)
        .await
        .unwrap_err();
    assert!(matches!(err, OrgError::CannotAcceptAsOwner { .. }));
    assert_eq!(owner_count(&f.engine, org.id).await, 1);
}

// --- resend ---

#[tokio::test]
async fn resend_revives_expired_invitation() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "grace@example.com", None, f.ada.id)
        .await
        .unwrap();

    let mut expired = inv.clone();
    expired.expires_at = Some(Utc::now() - Duration::days(1));
    f.store.update_invitation(&expired).await.unwrap();

    let resent = f.engine.resend_invitation(inv.id).await.unwrap();
    assert_eq!(resent.id, inv.id);
    assert_ne!(resent.token, inv.token);
    assert_eq!(resent.status(), InvitationStatus::Pending);
    assert!(resent.expires_at.unwrap() > Utc::now());
}

#[tokio::test]
async fn resend_refuses_accepted_invitation() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    let inv = f
        .engine
        .create_invitation(org.id, "grace@example.com", None, f.ada.id)
        .await
        .unwrap();
    f.engine
        .accept_invitation(inv.id, &f.grace, false)
        .await
        .unwrap();

    let err = f.engine.resend_invitation(inv.id).await.unwrap_err();
    assert!(matches!(err, OrgError::InvitationAlreadyAccepted { .. }));
}

// --- deletion guard ---

#[tokio::test]
async fn deletion_guard_blocks_owner() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();

    let err = f.engine.delete_user(f.ada.id).await.unwrap_err();
    assert!(matches!(err, OrgError::CannotDeleteOwner { owned: 1, .. }));

    // Nothing was cascaded: the owner membership is intact.
    assert!(f.engine.membership(org.id, f.ada.id).await.unwrap().is_some());
}

#[tokio::test]
async fn deletion_succeeds_after_transfer() {
    let f = fixture().await;
    let (org, _) = f.engine.create_organization(f.ada.id, "Acme").await.unwrap();
    f.engine
        .add_member(org.id, f.grace.id, RoleId::ADMIN, None)
        .await
        .unwrap();
    f.engine
        .transfer_ownership_to(org.id, f.grace.id)
        .await
        .unwrap();

    f.engine.ensure_user_deletable(f.ada.id).await.unwrap();
    f.engine.delete_user(f.ada.id).await.unwrap();

    assert!(f.engine.membership(org.id, f.ada.id).await.unwrap().is_none());
    // The organization keeps its (new) owner.
    let owner = f.engine.owner_of(org.id).await.unwrap().unwrap();
    assert_eq!(owner.user_id, f.grace.id);
}

// --- custom hierarchies ---

#[tokio::test]
async fn custom_hierarchy_drives_rank_checks() {
    use orgkit_rbac::{CompiledHierarchy, RoleDefinition, RoleRegistry};

    let lead = RoleId::new("lead");
    let registry = RoleRegistry::default();
    let mut defs = CompiledHierarchy::builtin_definitions();
    defs.push(
        RoleDefinition::new(lead.clone())
            .inherits(RoleId::ADMIN)
            .grants([Permission::new("approve_releases")]),
    );
    registry.configure(&defs).unwrap();

    let store = Arc::new(MemoryDirectory::new());
    let engine = OrgEngine::new(store).with_registry(registry);
    let ada = UserAccount::new("ada@example.com");
    let grace = UserAccount::new("grace@example.com");
    engine.register_user(&ada).await.unwrap();
    engine.register_user(&grace).await.unwrap();

    let (org, _) = engine.create_organization(ada.id, "Acme").await.unwrap();
    engine
        .add_member(org.id, grace.id, lead.clone(), None)
        .await
        .unwrap();

    // `lead` ranks above admin, so it can receive ownership.
    let (old_owner, new_owner) = engine.transfer_ownership_to(org.id, grace.id).await.unwrap();
    assert_eq!(old_owner.role, RoleId::ADMIN);
    assert!(new_owner.is_owner());
}
