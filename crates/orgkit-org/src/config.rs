//! Engine configuration surface
//!
//! Supplied by the host; format-agnostic. Everything has a sensible default
//! so `EngineConfig::default()` matches the product defaults.

use chrono::{DateTime, Duration, Utc};
use orgkit_rbac::RoleId;

/// Configuration read by the membership engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long invitations stay acceptable. `None` means they never expire.
    pub invitation_expiry: Option<Duration>,

    /// Role used when an invitation is created without an explicit role.
    pub default_invitation_role: RoleId,

    /// Maximum organizations a single user may own. `None` means unlimited.
    pub max_owned_organizations: Option<u32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invitation_expiry: Some(Duration::days(7)),
            default_invitation_role: RoleId::MEMBER,
            max_owned_organizations: None,
        }
    }
}

impl EngineConfig {
    /// Expiry timestamp for an invitation issued at `now`.
    pub fn invitation_expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.invitation_expiry.map(|d| now + d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_expiry_is_seven_days() {
        let config = EngineConfig::default();
        let now = Utc::now();
        let expires = config.invitation_expires_at(now).unwrap();
        assert_eq!(expires - now, Duration::days(7));
    }

    #[test]
    fn test_no_expiry() {
        let config = EngineConfig {
            invitation_expiry: None,
            ..EngineConfig::default()
        };
        assert!(config.invitation_expires_at(Utc::now()).is_none());
    }
}
