use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are opaque capability strings (e.g. "approve_user"). They are
/// defined at compile time and never stored per account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// Members
pub const VIEW_USERS: Permission = Permission::from_static("view_users");
pub const APPROVE_USER: Permission = Permission::from_static("approve_user");
pub const REJECT_USER: Permission = Permission::from_static("reject_user");
pub const SUSPEND_USER: Permission = Permission::from_static("suspend_user");
pub const UPDATE_USER: Permission = Permission::from_static("update_user");
pub const DELETE_USER: Permission = Permission::from_static("delete_user");

// Admins
pub const VIEW_ADMINS: Permission = Permission::from_static("view_admins");
pub const CREATE_ADMIN: Permission = Permission::from_static("create_admin");
pub const UPDATE_ADMIN_ROLE: Permission = Permission::from_static("update_admin_role");
pub const DELETE_ADMIN: Permission = Permission::from_static("delete_admin");

// Content
pub const MANAGE_NEWSLETTERS: Permission = Permission::from_static("manage_newsletters");
pub const PUBLISH_NEWSLETTER: Permission = Permission::from_static("publish_newsletter");
pub const MANAGE_PROJECTS: Permission = Permission::from_static("manage_projects");
pub const MANAGE_LMS: Permission = Permission::from_static("manage_lms");
pub const MANAGE_SCHOLARSHIPS: Permission = Permission::from_static("manage_scholarships");

// Oversight
pub const VIEW_AUDIT_LOGS: Permission = Permission::from_static("view_audit_logs");
pub const VIEW_ANALYTICS: Permission = Permission::from_static("view_analytics");
pub const MANAGE_SETTINGS: Permission = Permission::from_static("manage_settings");

/// Every permission that exists. SUPER_ADMIN is granted exactly this set, so
/// a permission added here needs no other registry edit.
pub const ALL: &[Permission] = &[
    VIEW_USERS,
    APPROVE_USER,
    REJECT_USER,
    SUSPEND_USER,
    UPDATE_USER,
    DELETE_USER,
    VIEW_ADMINS,
    CREATE_ADMIN,
    UPDATE_ADMIN_ROLE,
    DELETE_ADMIN,
    MANAGE_NEWSLETTERS,
    PUBLISH_NEWSLETTER,
    MANAGE_PROJECTS,
    MANAGE_LMS,
    MANAGE_SCHOLARSHIPS,
    VIEW_AUDIT_LOGS,
    VIEW_ANALYTICS,
    MANAGE_SETTINGS,
];
