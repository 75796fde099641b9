//! # Orgkit RBAC (Role-Based Access Control)
//!
//! This crate compiles configurable role hierarchies into concrete permission
//! sets for the orgkit membership engine.
//!
//! ## Overview
//!
//! The orgkit-rbac crate handles:
//! - **Permissions**: Named capability symbols (built-in and custom)
//! - **Roles**: Named roles arranged in an inheritance hierarchy
//! - **Hierarchy compilation**: A pure function from role definitions to a
//!   permission-set map, validated eagerly (duplicates, unknown parents,
//!   cycles are configuration errors, never runtime surprises)
//! - **Registry**: A process-wide, atomically swappable slot holding the
//!   active compiled hierarchy
//!
//! ## Architecture
//!
//! ```text
//! RoleDefinition[] ──compile──▶ CompiledHierarchy
//!                                 ├─ role ─▶ permission set (parent ⊆ child)
//!                                 ├─ role ─▶ rank (distance from root)
//!                                 └─ role ─▶ parent
//!
//! RoleRegistry ─▶ Arc<CompiledHierarchy>   (swapped atomically on configure)
//! ```
//!
//! ## Built-in hierarchy
//!
//! `viewer < member < admin < owner`, each level inheriting the previous:
//!
//! | Role   | Adds                                                            |
//! |--------|-----------------------------------------------------------------|
//! | viewer | view                                                            |
//! | member | (nothing; inherits view)                                        |
//! | admin  | invite_members, remove_members, edit_roles                      |
//! | owner  | manage_settings, manage_billing, transfer_ownership, delete_organization |
//!
//! ## Usage
//!
//! ```rust
//! use orgkit_rbac::{Permission, RoleId, RoleRegistry};
//!
//! let registry = RoleRegistry::default();
//! assert!(registry.has_permission(&RoleId::ADMIN, &Permission::INVITE_MEMBERS));
//! assert!(!registry.has_permission(&RoleId::MEMBER, &Permission::INVITE_MEMBERS));
//!
//! // Every clone of the handle observes reconfiguration immediately.
//! let handle = registry.clone();
//! assert!(handle.valid_role(&RoleId::VIEWER));
//! ```

pub mod error;
pub mod hierarchy;
pub mod permission;
pub mod registry;

// Re-export main types for convenience
pub use error::RoleConfigError;
pub use hierarchy::{CompiledHierarchy, RoleDefinition};
pub use permission::{Permission, RoleId};
pub use registry::RoleRegistry;
