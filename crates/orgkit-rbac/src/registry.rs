//! Process-wide role registry
//!
//! The registry is a cloneable handle around the active [`CompiledHierarchy`].
//! Reconfiguration swaps the compiled hierarchy atomically: readers take an
//! `Arc` snapshot, so no caller ever observes a half-updated permission map,
//! and every clone of the handle sees a new configuration immediately.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::RoleConfigResult;
use crate::hierarchy::{CompiledHierarchy, RoleDefinition};
use crate::permission::{Permission, RoleId};

/// Shared handle to the active role hierarchy.
///
/// Cloning is cheap (an `Arc` clone) and all clones share one slot. The
/// default registry holds the built-in `viewer < member < admin < owner`
/// hierarchy.
///
/// # Example
///
/// ```
/// use orgkit_rbac::{CompiledHierarchy, Permission, RoleDefinition, RoleId, RoleRegistry};
///
/// let registry = RoleRegistry::default();
/// let handle = registry.clone();
///
/// let mut defs = CompiledHierarchy::builtin_definitions();
/// defs.push(
///     RoleDefinition::new(RoleId::new("auditor"))
///         .inherits(RoleId::VIEWER)
///         .grants([Permission::new("export_audit_log")]),
/// );
/// registry.configure(&defs).unwrap();
///
/// // The clone observes the new hierarchy.
/// assert!(handle.valid_role(&RoleId::new("auditor")));
/// ```
#[derive(Debug, Clone)]
pub struct RoleRegistry {
    active: Arc<RwLock<Arc<CompiledHierarchy>>>,
}

impl Default for RoleRegistry {
    fn default() -> Self {
        Self::new(CompiledHierarchy::builtin())
    }
}

impl RoleRegistry {
    /// Create a registry holding the given hierarchy.
    pub fn new(hierarchy: CompiledHierarchy) -> Self {
        Self {
            active: Arc::new(RwLock::new(Arc::new(hierarchy))),
        }
    }

    /// Replace the active hierarchy.
    ///
    /// Compilation validates eagerly; on error the previous hierarchy stays
    /// active and untouched. On success the swap is atomic: in-flight
    /// readers keep their snapshot, new reads see the new hierarchy.
    pub fn configure(&self, definitions: &[RoleDefinition]) -> RoleConfigResult<()> {
        let compiled = Arc::new(CompiledHierarchy::compile(definitions)?);
        *self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner) = compiled;
        Ok(())
    }

    /// Take a snapshot of the active hierarchy.
    ///
    /// The snapshot is immutable and unaffected by later reconfiguration;
    /// use it when several checks must agree on one configuration.
    pub fn snapshot(&self) -> Arc<CompiledHierarchy> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Full permission set of a role.
    ///
    /// # Errors
    ///
    /// [`RoleConfigError::UnknownRole`](crate::RoleConfigError::UnknownRole)
    /// if the active hierarchy does not define the role.
    pub fn permissions_for(&self, role: &RoleId) -> RoleConfigResult<HashSet<Permission>> {
        self.snapshot().permissions_for(role).cloned()
    }

    /// Check whether a role grants a permission. Unknown roles grant nothing.
    pub fn has_permission(&self, role: &RoleId, permission: &Permission) -> bool {
        self.snapshot().has_permission(role, permission)
    }

    /// Check whether the active hierarchy defines a role.
    pub fn valid_role(&self, role: &RoleId) -> bool {
        self.snapshot().contains(role)
    }

    /// Rank of a role in the active hierarchy (distance from the root).
    pub fn rank_of(&self, role: &RoleId) -> Option<usize> {
        self.snapshot().rank_of(role)
    }

    /// Parent of a role in the active hierarchy.
    pub fn parent_of(&self, role: &RoleId) -> Option<RoleId> {
        self.snapshot().parent_of(role).cloned()
    }
}
