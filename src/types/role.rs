use std::fmt;

use serde::{Deserialize, Serialize};

/// Role assigned to a user account. Capabilities derive purely from the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Manager,
    #[default]
    Viewer,
}

impl Role {
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Admins count as managers for access checks.
    #[must_use]
    pub const fn is_manager(self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }

    #[must_use]
    pub const fn can_create(self) -> bool {
        self.is_manager()
    }

    #[must_use]
    pub const fn can_edit(self) -> bool {
        self.is_manager()
    }

    #[must_use]
    pub const fn can_delete(self) -> bool {
        self.is_admin()
    }

    #[must_use]
    pub const fn can_import(self) -> bool {
        self.is_admin()
    }

    /// Every role may export. Intentional: exports carry no more data than
    /// the list views already expose.
    #[must_use]
    pub const fn can_export(self) -> bool {
        true
    }

    #[must_use]
    pub const fn can_view_audit(self) -> bool {
        self.is_manager()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Viewer => "viewer",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "admin" => Some(Role::Admin),
            "manager" => Some(Role::Manager),
            "viewer" => Some(Role::Viewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_capabilities() {
        let r = Role::Viewer;
        assert!(!r.can_create());
        assert!(!r.can_edit());
        assert!(!r.can_delete());
        assert!(!r.can_import());
        assert!(!r.can_view_audit());
        assert!(r.can_export());
    }

    #[test]
    fn test_manager_capabilities() {
        let r = Role::Manager;
        assert!(r.can_create());
        assert!(r.can_edit());
        assert!(r.can_view_audit());
        assert!(!r.can_delete());
        assert!(!r.can_import());
        assert!(r.can_export());
    }

    #[test]
    fn test_admin_capabilities() {
        let r = Role::Admin;
        assert!(r.can_create());
        assert!(r.can_edit());
        assert!(r.can_delete());
        assert!(r.can_import());
        assert!(r.can_view_audit());
        assert!(r.can_export());
    }

    #[test]
    fn test_parse_roundtrip() {
        for r in [Role::Admin, Role::Manager, Role::Viewer] {
            assert_eq!(Role::parse(r.as_str()), Some(r));
        }
        assert_eq!(Role::parse("superuser"), None);
    }
}
