//! # Permissions and role identifiers
//!
//! Core vocabulary types for the RBAC system. A [`Permission`] is a named
//! capability symbol; a [`RoleId`] names a role in the configured hierarchy.
//! Both are thin string newtypes so custom hierarchies can introduce their
//! own symbols without touching this crate.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// A named capability granted by a role.
///
/// The built-in permission table is exposed as associated constants; hosts
/// with custom hierarchies can mint their own symbols with [`Permission::new`].
///
/// # Example
///
/// ```
/// use orgkit_rbac::Permission;
///
/// assert_eq!(Permission::INVITE_MEMBERS.as_str(), "invite_members");
///
/// let custom = Permission::new("export_audit_log");
/// assert_eq!(custom.as_str(), "export_audit_log");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    /// Read access to organization resources.
    pub const VIEW: Permission = Permission::borrowed("view");
    /// Create invitations for the organization.
    pub const INVITE_MEMBERS: Permission = Permission::borrowed("invite_members");
    /// Remove members from the organization.
    pub const REMOVE_MEMBERS: Permission = Permission::borrowed("remove_members");
    /// Change member roles.
    pub const EDIT_ROLES: Permission = Permission::borrowed("edit_roles");
    /// Manage organization-level settings.
    pub const MANAGE_SETTINGS: Permission = Permission::borrowed("manage_settings");
    /// Manage billing and subscription state.
    pub const MANAGE_BILLING: Permission = Permission::borrowed("manage_billing");
    /// Transfer organization ownership.
    pub const TRANSFER_OWNERSHIP: Permission = Permission::borrowed("transfer_ownership");
    /// Delete the organization.
    pub const DELETE_ORGANIZATION: Permission = Permission::borrowed("delete_organization");

    const fn borrowed(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    /// Create a permission symbol from an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the string representation of the permission.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// The name of a role in the configured hierarchy.
///
/// The four built-in roles are exposed as associated constants. Role names
/// are compared case-sensitively; configuration is expected to use lowercase
/// identifiers, matching the built-ins.
///
/// # Example
///
/// ```
/// use orgkit_rbac::RoleId;
///
/// assert_eq!(RoleId::OWNER.as_str(), "owner");
/// assert!(RoleId::OWNER.is_owner());
/// assert!(!RoleId::ADMIN.is_owner());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(Cow<'static, str>);

impl RoleId {
    /// Read-only access.
    pub const VIEWER: RoleId = RoleId::borrowed("viewer");
    /// Regular member.
    pub const MEMBER: RoleId = RoleId::borrowed("member");
    /// Can manage members and roles.
    pub const ADMIN: RoleId = RoleId::borrowed("admin");
    /// Full organization control. Assigned only through ownership transfer.
    pub const OWNER: RoleId = RoleId::borrowed("owner");

    const fn borrowed(s: &'static str) -> Self {
        Self(Cow::Borrowed(s))
    }

    /// Create a role identifier from an arbitrary name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Get the string representation of the role name.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether this is the reserved `owner` role.
    ///
    /// The owner role may never be assigned through generic add/promote
    /// paths, only through an ownership transfer.
    pub fn is_owner(&self) -> bool {
        *self == RoleId::OWNER
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoleId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
