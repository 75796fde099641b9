//! Error types for role hierarchy configuration
//!
//! Configuration problems are rejected eagerly at compile/configure time so
//! the engine never discovers a broken hierarchy mid-operation.

use thiserror::Error;

use crate::permission::RoleId;

/// Role hierarchy configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoleConfigError {
    /// The same role name was defined more than once.
    #[error("role '{0}' is defined more than once")]
    DuplicateRole(RoleId),

    /// A role inherits from a role that is not defined.
    #[error("role '{role}' inherits from unknown role '{parent}'")]
    UnknownParent { role: RoleId, parent: RoleId },

    /// The declared hierarchy contains an inheritance cycle.
    #[error("role hierarchy contains a cycle through '{0}'")]
    Cycle(RoleId),

    /// The hierarchy does not define the reserved `owner` role.
    #[error("role hierarchy must define an 'owner' role")]
    MissingOwnerRole,

    /// The `owner` role has no parent to demote a former owner to.
    #[error("the 'owner' role must inherit from another role")]
    OwnerWithoutParent,

    /// A role name was looked up that the active hierarchy does not define.
    #[error("unknown role: '{0}'")]
    UnknownRole(RoleId),
}

/// Result type for role configuration operations.
pub type RoleConfigResult<T> = Result<T, RoleConfigError>;

impl RoleConfigError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            RoleConfigError::DuplicateRole(_) => "DUPLICATE_ROLE",
            RoleConfigError::UnknownParent { .. } => "UNKNOWN_PARENT_ROLE",
            RoleConfigError::Cycle(_) => "ROLE_HIERARCHY_CYCLE",
            RoleConfigError::MissingOwnerRole => "MISSING_OWNER_ROLE",
            RoleConfigError::OwnerWithoutParent => "OWNER_WITHOUT_PARENT",
            RoleConfigError::UnknownRole(_) => "UNKNOWN_ROLE",
        }
    }
}
