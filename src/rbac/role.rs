/// Account roles
use crate::error::{Denial, ErrorCode};
use serde::{Deserialize, Serialize};

/// Role assigned to an account.
///
/// Roles are the unit of assignment; authorization decisions are made on the
/// permissions a role resolves to (see [`super::PermissionRegistry`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Freshly registered alumnus
    User,
    /// Approved member without admin duties
    Member,
    /// Manages membership approvals
    MemberAdmin,
    /// Manages projects, courses and scholarships
    ContentAdmin,
    /// Manages newsletters
    NewsletterAdmin,
    /// Full access, including admin management
    SuperAdmin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::User,
        Role::Member,
        Role::MemberAdmin,
        Role::ContentAdmin,
        Role::NewsletterAdmin,
        Role::SuperAdmin,
    ];

    pub const ADMIN_TIERS: [Role; 4] = [
        Role::MemberAdmin,
        Role::ContentAdmin,
        Role::NewsletterAdmin,
        Role::SuperAdmin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Member => "MEMBER",
            Role::MemberAdmin => "MEMBER_ADMIN",
            Role::ContentAdmin => "CONTENT_ADMIN",
            Role::NewsletterAdmin => "NEWSLETTER_ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Parse a role name. The set is closed: anything else is INVALID_ROLE.
    pub fn parse(s: &str) -> Result<Self, Denial> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| {
                Denial::new(ErrorCode::InvalidRole, format!("Invalid role: {}", s))
                    .with("validRoles", Role::ALL.map(|r| r.as_str()))
            })
    }

    /// True iff this role is one of the four admin tiers
    pub fn is_admin_tier(&self) -> bool {
        Role::ADMIN_TIERS.contains(self)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_parse() {
        for role in Role::ALL {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }

        let err = Role::parse("super_admin").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidRole);
        assert!(Role::parse("ADMIN").is_err());
        assert!(Role::parse("").is_err());
    }

    #[test]
    fn test_admin_tiers() {
        assert!(!Role::User.is_admin_tier());
        assert!(!Role::Member.is_admin_tier());
        assert!(Role::MemberAdmin.is_admin_tier());
        assert!(Role::ContentAdmin.is_admin_tier());
        assert!(Role::NewsletterAdmin.is_admin_tier());
        assert!(Role::SuperAdmin.is_admin_tier());
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&Role::NewsletterAdmin).unwrap();
        assert_eq!(json, "\"NEWSLETTER_ADMIN\"");

        let role: Role = serde_json::from_str("\"CONTENT_ADMIN\"").unwrap();
        assert_eq!(role, Role::ContentAdmin);
    }
}
