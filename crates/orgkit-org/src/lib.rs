//! # Orgkit Organization Management
//!
//! Multi-tenant membership core: organizations, memberships, invitations,
//! and the invariant engine that keeps them consistent under concurrency.
//!
//! ## Overview
//!
//! The orgkit-org crate handles:
//! - **Organizations**: Top-level tenant entities with a metadata map
//! - **Memberships**: User-organization links carrying a role
//! - **Invitations**: Email invitations with derived pending/accepted/expired
//!   status, idempotent creation, and single-use acceptance
//! - **Invariant engine**: Add/remove/change-role/transfer operations that
//!   guarantee exactly one owner per organization under per-organization
//!   locking
//! - **Hooks**: Strict (pre-commit, vetoable) and lenient (post-commit,
//!   best-effort) lifecycle callbacks
//! - **Deletion guard**: Blocks deleting a user who still owns an
//!   organization, checked before any cascading cleanup
//!
//! ## Architecture
//!
//! ```text
//! OrgEngine<D: Directory>
//!   ├─ RoleRegistry (orgkit-rbac)   authorization + role ranks
//!   ├─ HookRegistry                 strict / lenient dispatch
//!   ├─ LockManager                  one exclusive lock per organization
//!   └─ D: Directory                 organizations, memberships,
//!                                   invitations, users (+ constraints)
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use orgkit_org::{MemoryDirectory, OrgEngine, UserAccount};
//! use orgkit_rbac::RoleId;
//!
//! # #[tokio::main(flavor = "current_thread")] async fn main() -> Result<(), orgkit_org::OrgError> {
//! let engine = OrgEngine::new(Arc::new(MemoryDirectory::new()));
//!
//! let ada = UserAccount::new("ada@example.com");
//! let grace = UserAccount::new("grace@example.com");
//! engine.register_user(&ada).await?;
//! engine.register_user(&grace).await?;
//!
//! let (org, _owner) = engine.create_organization(ada.id, "Acme Corp").await?;
//!
//! // Invite, accept, and the membership materializes with the invited role.
//! let invitation = engine
//!     .create_invitation(org.id, &grace.email, Some(RoleId::ADMIN), ada.id)
//!     .await?;
//! let membership = engine.accept_invitation(invitation.id, &grace, false).await?;
//! assert_eq!(membership.role, RoleId::ADMIN);
//! # Ok(()) }
//! ```
//!
//! ## Concurrency model
//!
//! Every mutating operation holds an exclusive per-organization lock across
//! read-validate-write, so conflicting requests serialize: the loser of a
//! race observes the winner's committed state and resolves idempotently or
//! with a named error, never by corrupting the single-owner invariant. Store
//! uniqueness constraints are the last line of defense; constraint races are
//! translated back into domain outcomes, never leaked raw.
//!
//! ## Feature Flags
//!
//! - `memory`: The in-memory reference store (enabled by default)

pub mod config;
pub mod engine;
pub mod error;
pub mod hooks;
pub mod invitation;
pub mod locks;
pub mod membership;
pub mod organization;
pub mod store;
pub mod user;

// Re-export main types for convenience
pub use config::EngineConfig;
pub use engine::OrgEngine;
pub use error::{OrgError, OrgResult};
pub use hooks::{HookContext, HookEvent, HookRegistry};
pub use invitation::{Invitation, InvitationStatus};
pub use membership::Membership;
pub use organization::Organization;
#[cfg(feature = "memory")]
pub use store::MemoryDirectory;
pub use store::{Directory, StoreError};
pub use user::UserAccount;
