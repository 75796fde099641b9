//! Role hierarchy compilation
//!
//! This module turns a list of [`RoleDefinition`]s into a [`CompiledHierarchy`]:
//! an immutable map from role to its full (inherited) permission set, plus the
//! rank and parent of every role. Compilation is a pure function and performs
//! all validation eagerly: duplicates, unknown parents, and cycles are
//! configuration errors, never runtime errors.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{RoleConfigError, RoleConfigResult};
use crate::permission::{Permission, RoleId};

/// Declarative definition of one role in a hierarchy.
///
/// A role declares its name, the role it inherits from (if any), and the
/// permissions it grants directly. The compiled permission set of a role is
/// the union of its direct grants and everything its ancestors grant.
///
/// # Example
///
/// ```
/// use orgkit_rbac::{Permission, RoleDefinition, RoleId};
///
/// let auditor = RoleDefinition::new(RoleId::new("auditor"))
///     .inherits(RoleId::VIEWER)
///     .grants([Permission::new("export_audit_log")]);
/// assert_eq!(auditor.inherits, Some(RoleId::VIEWER));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name (unique within a hierarchy).
    pub name: RoleId,

    /// Parent role whose permissions this role inherits, if any.
    pub inherits: Option<RoleId>,

    /// Permissions granted directly by this role.
    #[serde(default)]
    pub grants: Vec<Permission>,
}

impl RoleDefinition {
    /// Create a root role definition with no parent and no direct grants.
    pub fn new(name: RoleId) -> Self {
        Self {
            name,
            inherits: None,
            grants: Vec::new(),
        }
    }

    /// Set the parent role.
    pub fn inherits(mut self, parent: RoleId) -> Self {
        self.inherits = Some(parent);
        self
    }

    /// Set the directly granted permissions.
    pub fn grants<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.grants = permissions.into_iter().collect();
        self
    }
}

/// An immutable, fully validated role hierarchy.
///
/// Produced by [`CompiledHierarchy::compile`] and shared read-only through the
/// [`RoleRegistry`](crate::RoleRegistry). For every role the compiled form
/// records:
///
/// - the full permission set (direct grants ∪ all ancestor grants)
/// - the rank: distance from the hierarchy root (used for promote/demote
///   direction checks)
/// - the parent role (used to pick the demotion target when ownership is
///   transferred)
///
/// The invariant `permissions_for(child) ⊇ permissions_for(parent)` holds by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledHierarchy {
    permissions: HashMap<RoleId, HashSet<Permission>>,
    ranks: HashMap<RoleId, usize>,
    parents: HashMap<RoleId, Option<RoleId>>,
}

impl CompiledHierarchy {
    /// Compile a hierarchy from role definitions.
    ///
    /// # Errors
    ///
    /// - [`RoleConfigError::DuplicateRole`] if a name appears twice
    /// - [`RoleConfigError::UnknownParent`] if a role inherits from an
    ///   undefined role
    /// - [`RoleConfigError::Cycle`] if the inheritance graph is cyclic
    /// - [`RoleConfigError::MissingOwnerRole`] if no `owner` role is defined
    /// - [`RoleConfigError::OwnerWithoutParent`] if `owner` is a root role
    ///   (the transfer operation demotes the former owner to the owner
    ///   role's parent, so one must exist)
    pub fn compile(definitions: &[RoleDefinition]) -> RoleConfigResult<Self> {
        let mut by_name: HashMap<&RoleId, &RoleDefinition> = HashMap::new();
        for def in definitions {
            if by_name.insert(&def.name, def).is_some() {
                return Err(RoleConfigError::DuplicateRole(def.name.clone()));
            }
        }

        for def in definitions {
            if let Some(parent) = &def.inherits {
                if !by_name.contains_key(parent) {
                    return Err(RoleConfigError::UnknownParent {
                        role: def.name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
        }

        let owner = by_name
            .get(&RoleId::OWNER)
            .ok_or(RoleConfigError::MissingOwnerRole)?;
        if owner.inherits.is_none() {
            return Err(RoleConfigError::OwnerWithoutParent);
        }

        let mut permissions = HashMap::with_capacity(definitions.len());
        let mut ranks = HashMap::with_capacity(definitions.len());
        let mut parents = HashMap::with_capacity(definitions.len());

        for def in definitions {
            // Walk the inheritance chain up to the root, unioning grants.
            // A chain longer than the number of roles means a cycle.
            let mut granted: HashSet<Permission> = HashSet::new();
            let mut rank = 0usize;
            let mut visited: HashSet<&RoleId> = HashSet::new();
            let mut cursor = Some(&def.name);

            while let Some(name) = cursor {
                if !visited.insert(name) {
                    return Err(RoleConfigError::Cycle(def.name.clone()));
                }
                // Parent presence was validated above.
                let node = by_name[name];
                granted.extend(node.grants.iter().cloned());
                cursor = node.inherits.as_ref();
                if cursor.is_some() {
                    rank += 1;
                }
            }

            permissions.insert(def.name.clone(), granted);
            ranks.insert(def.name.clone(), rank);
            parents.insert(def.name.clone(), def.inherits.clone());
        }

        Ok(Self {
            permissions,
            ranks,
            parents,
        })
    }

    /// The built-in four-role hierarchy: `viewer < member < admin < owner`.
    pub fn builtin() -> Self {
        let defs = Self::builtin_definitions();
        // The built-in table is acyclic by inspection.
        Self::compile(&defs).unwrap_or_else(|e| {
            unreachable!("built-in role hierarchy failed to compile: {e}")
        })
    }

    /// Definitions of the built-in hierarchy, for hosts that want to extend
    /// it rather than replace it wholesale.
    pub fn builtin_definitions() -> Vec<RoleDefinition> {
        vec![
            RoleDefinition::new(RoleId::VIEWER).grants([Permission::VIEW]),
            RoleDefinition::new(RoleId::MEMBER).inherits(RoleId::VIEWER),
            RoleDefinition::new(RoleId::ADMIN).inherits(RoleId::MEMBER).grants([
                Permission::INVITE_MEMBERS,
                Permission::REMOVE_MEMBERS,
                Permission::EDIT_ROLES,
            ]),
            RoleDefinition::new(RoleId::OWNER).inherits(RoleId::ADMIN).grants([
                Permission::MANAGE_SETTINGS,
                Permission::MANAGE_BILLING,
                Permission::TRANSFER_OWNERSHIP,
                Permission::DELETE_ORGANIZATION,
            ]),
        ]
    }

    /// Check whether the hierarchy defines a role.
    pub fn contains(&self, role: &RoleId) -> bool {
        self.permissions.contains_key(role)
    }

    /// Full permission set of a role, or an error for an unknown role.
    pub fn permissions_for(&self, role: &RoleId) -> RoleConfigResult<&HashSet<Permission>> {
        self.permissions
            .get(role)
            .ok_or_else(|| RoleConfigError::UnknownRole(role.clone()))
    }

    /// Check whether a role grants a permission.
    ///
    /// Unknown roles grant nothing.
    pub fn has_permission(&self, role: &RoleId, permission: &Permission) -> bool {
        self.permissions
            .get(role)
            .is_some_and(|set| set.contains(permission))
    }

    /// Rank of a role: its distance from the hierarchy root.
    pub fn rank_of(&self, role: &RoleId) -> Option<usize> {
        self.ranks.get(role).copied()
    }

    /// Parent of a role in the hierarchy, if it has one.
    pub fn parent_of(&self, role: &RoleId) -> Option<&RoleId> {
        self.parents.get(role).and_then(|p| p.as_ref())
    }

    /// All role names defined by this hierarchy.
    pub fn roles(&self) -> impl Iterator<Item = &RoleId> {
        self.permissions.keys()
    }
}
