use std::collections::{BTreeSet, HashMap};

use super::permission::{self as perm, Permission};
use super::Role;

const USER_RESOURCE: &[Permission] = &[perm::VIEW_USERS, perm::UPDATE_USER];
const ADMIN_RESOURCE: &[Permission] = &[perm::VIEW_ADMINS, perm::CREATE_ADMIN];
const NEWSLETTER_RESOURCE: &[Permission] = &[perm::MANAGE_NEWSLETTERS];
const PROJECT_RESOURCE: &[Permission] = &[perm::MANAGE_PROJECTS];
const LMS_RESOURCE: &[Permission] = &[perm::MANAGE_LMS];
const SCHOLARSHIP_RESOURCE: &[Permission] = &[perm::MANAGE_SCHOLARSHIPS];

/// Permissions that grant access to a named resource type, if the name is known
pub fn resource_permissions(resource_type: &str) -> Option<&'static [Permission]> {
    match resource_type {
        "user" => Some(USER_RESOURCE),
        "admin" => Some(ADMIN_RESOURCE),
        "newsletter" => Some(NEWSLETTER_RESOURCE),
        "project" => Some(PROJECT_RESOURCE),
        "lms" => Some(LMS_RESOURCE),
        "scholarship" => Some(SCHOLARSHIP_RESOURCE),
        _ => None,
    }
}

/// Immutable role → permission mapping.
///
/// Invariants:
/// - SUPER_ADMIN resolves to the whole permission universe.
/// - USER and MEMBER resolve to the empty set, whatever was granted.
///
/// No IO, no panics. Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone)]
pub struct PermissionRegistry {
    universe: BTreeSet<Permission>,
    grants: HashMap<Role, BTreeSet<Permission>>,
    empty: BTreeSet<Permission>,
}

impl PermissionRegistry {
    /// Registry over `universe` with no tier grants yet
    pub fn new(universe: impl IntoIterator<Item = Permission>) -> Self {
        Self {
            universe: universe.into_iter().collect(),
            grants: HashMap::new(),
            empty: BTreeSet::new(),
        }
    }

    /// Grant permissions to a role. A granted permission missing from the
    /// universe joins it, so SUPER_ADMIN always stays a superset.
    pub fn grant(mut self, role: Role, permissions: impl IntoIterator<Item = Permission>) -> Self {
        let entry = self.grants.entry(role).or_default();
        for permission in permissions {
            self.universe.insert(permission.clone());
            entry.insert(permission);
        }
        self
    }

    /// The association's standard mapping
    pub fn standard() -> Self {
        Self::new(perm::ALL.iter().cloned())
            .grant(
                Role::MemberAdmin,
                [
                    perm::VIEW_USERS,
                    perm::APPROVE_USER,
                    perm::REJECT_USER,
                    perm::SUSPEND_USER,
                    perm::UPDATE_USER,
                    perm::VIEW_ANALYTICS,
                ],
            )
            .grant(
                Role::ContentAdmin,
                [
                    perm::MANAGE_PROJECTS,
                    perm::MANAGE_LMS,
                    perm::MANAGE_SCHOLARSHIPS,
                    perm::VIEW_ANALYTICS,
                ],
            )
            .grant(
                Role::NewsletterAdmin,
                [
                    perm::MANAGE_NEWSLETTERS,
                    perm::PUBLISH_NEWSLETTER,
                    perm::VIEW_ANALYTICS,
                ],
            )
    }

    /// Every permission that exists
    pub fn universe(&self) -> &BTreeSet<Permission> {
        &self.universe
    }

    pub fn permissions_of(&self, role: Role) -> &BTreeSet<Permission> {
        match role {
            Role::SuperAdmin => &self.universe,
            Role::User | Role::Member => &self.empty,
            tier => self.grants.get(&tier).unwrap_or(&self.empty),
        }
    }

    /// Like [`permissions_of`](Self::permissions_of) for an unparsed role
    /// name; unknown names resolve to the empty set.
    pub fn permissions_of_name(&self, role: &str) -> &BTreeSet<Permission> {
        match Role::parse(role) {
            Ok(role) => self.permissions_of(role),
            Err(_) => &self.empty,
        }
    }

    pub fn has_permission(&self, role: Role, permission: &Permission) -> bool {
        self.permissions_of(role).contains(permission)
    }

    /// True iff at least one requested permission is held. Empty input is false.
    pub fn has_any_permission(&self, role: Role, permissions: &[Permission]) -> bool {
        let held = self.permissions_of(role);
        permissions.iter().any(|p| held.contains(p))
    }

    /// True iff every requested permission is held. Requiring nothing is
    /// vacuously satisfied, so empty input is true for every role.
    pub fn has_all_permissions(&self, role: Role, permissions: &[Permission]) -> bool {
        let held = self.permissions_of(role);
        permissions.iter().all(|p| held.contains(p))
    }

    /// Membership in the fixed admin-tier set, independent of grants
    pub fn is_admin_role(&self, role: Role) -> bool {
        role.is_admin_tier()
    }

    /// Like [`is_admin_role`](Self::is_admin_role) for an unparsed name
    pub fn is_admin_role_name(&self, role: &str) -> bool {
        Role::parse(role).map(|r| r.is_admin_tier()).unwrap_or(false)
    }

    /// Whether the role holds any permission guarding the named resource type.
    /// Unknown resource types are refused.
    pub fn can_access_resource(&self, role: Role, resource_type: &str) -> bool {
        match resource_permissions(resource_type) {
            Some(required) => self.has_any_permission(role, required),
            None => false,
        }
    }
}

impl Default for PermissionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> PermissionRegistry {
        PermissionRegistry::standard()
    }

    #[test]
    fn test_has_permission_matches_membership_for_every_role() {
        let registry = registry();
        for role in Role::ALL {
            let held = registry.permissions_of(role).clone();
            for permission in perm::ALL {
                assert_eq!(
                    registry.has_permission(role, permission),
                    held.contains(permission),
                    "{} / {}",
                    role,
                    permission
                );
            }
        }
    }

    #[test]
    fn test_super_admin_holds_universe() {
        let registry = registry();
        let expected: BTreeSet<Permission> = perm::ALL.iter().cloned().collect();
        assert_eq!(registry.permissions_of(Role::SuperAdmin), &expected);
        for permission in perm::ALL {
            assert!(registry.has_permission(Role::SuperAdmin, permission));
        }
    }

    #[test]
    fn test_super_admin_gains_new_permissions_automatically() {
        const MANAGE_EVENTS: Permission = Permission::from_static("manage_events");

        let universe = perm::ALL.iter().cloned().chain([MANAGE_EVENTS]);
        let registry = PermissionRegistry::new(universe)
            .grant(Role::MemberAdmin, [perm::APPROVE_USER]);

        assert!(registry.has_permission(Role::SuperAdmin, &MANAGE_EVENTS));
        assert!(!registry.has_permission(Role::MemberAdmin, &MANAGE_EVENTS));
        assert_eq!(registry.permissions_of(Role::SuperAdmin).len(), perm::ALL.len() + 1);
    }

    #[test]
    fn test_granting_outside_universe_extends_super_admin() {
        let scoped = Permission::new("export_members".to_string());
        let registry = PermissionRegistry::new(Vec::new()).grant(Role::ContentAdmin, [scoped.clone()]);

        assert!(registry.has_permission(Role::ContentAdmin, &scoped));
        assert!(registry.has_permission(Role::SuperAdmin, &scoped));
    }

    #[test]
    fn test_non_admin_roles_have_no_permissions() {
        let registry = PermissionRegistry::standard()
            .grant(Role::Member, [perm::VIEW_USERS])
            .grant(Role::User, [perm::APPROVE_USER]);

        for role in [Role::User, Role::Member] {
            assert!(registry.permissions_of(role).is_empty());
            assert!(!registry.is_admin_role(role));
        }
    }

    #[test]
    fn test_admin_role_matrix() {
        let registry = registry();
        for name in ["MEMBER_ADMIN", "CONTENT_ADMIN", "NEWSLETTER_ADMIN", "SUPER_ADMIN"] {
            assert!(registry.is_admin_role_name(name), "{}", name);
        }
        for name in ["USER", "MEMBER", "ADMIN", "super_admin", ""] {
            assert!(!registry.is_admin_role_name(name), "{}", name);
        }
    }

    #[test]
    fn test_empty_requirement_lists() {
        let registry = registry();
        for role in Role::ALL {
            assert!(registry.has_all_permissions(role, &[]));
            assert!(!registry.has_any_permission(role, &[]));
        }
    }

    #[test]
    fn test_any_and_all_semantics() {
        let registry = registry();
        let mixed = [perm::APPROVE_USER, perm::MANAGE_NEWSLETTERS];

        assert!(registry.has_any_permission(Role::MemberAdmin, &mixed));
        assert!(!registry.has_all_permissions(Role::MemberAdmin, &mixed));
        assert!(registry.has_all_permissions(Role::SuperAdmin, &mixed));
        assert!(!registry.has_any_permission(Role::ContentAdmin, &mixed));
    }

    #[test]
    fn test_tier_grants() {
        let registry = registry();

        assert!(registry.has_permission(Role::MemberAdmin, &perm::APPROVE_USER));
        assert!(registry.has_permission(Role::MemberAdmin, &perm::REJECT_USER));
        assert!(registry.has_permission(Role::MemberAdmin, &perm::SUSPEND_USER));
        assert!(!registry.has_permission(Role::MemberAdmin, &perm::CREATE_ADMIN));

        assert!(registry.has_permission(Role::ContentAdmin, &perm::MANAGE_LMS));
        assert!(!registry.has_permission(Role::ContentAdmin, &perm::APPROVE_USER));

        assert!(registry.has_permission(Role::NewsletterAdmin, &perm::PUBLISH_NEWSLETTER));
        assert!(!registry.has_permission(Role::NewsletterAdmin, &perm::MANAGE_PROJECTS));
    }

    #[test]
    fn test_unknown_role_name_resolves_to_empty_set() {
        let registry = registry();
        assert!(registry.permissions_of_name("GUEST").is_empty());
        assert_eq!(
            registry.permissions_of_name("SUPER_ADMIN"),
            registry.permissions_of(Role::SuperAdmin)
        );
    }

    #[test]
    fn test_can_access_resource() {
        let registry = registry();

        assert!(registry.can_access_resource(Role::MemberAdmin, "user"));
        assert!(!registry.can_access_resource(Role::MemberAdmin, "admin"));
        assert!(registry.can_access_resource(Role::ContentAdmin, "project"));
        assert!(registry.can_access_resource(Role::ContentAdmin, "lms"));
        assert!(registry.can_access_resource(Role::ContentAdmin, "scholarship"));
        assert!(registry.can_access_resource(Role::NewsletterAdmin, "newsletter"));
        assert!(!registry.can_access_resource(Role::NewsletterAdmin, "user"));
        assert!(!registry.can_access_resource(Role::Member, "user"));

        for resource in ["user", "admin", "newsletter", "project", "lms", "scholarship"] {
            assert!(registry.can_access_resource(Role::SuperAdmin, resource));
        }

        assert!(!registry.can_access_resource(Role::SuperAdmin, "billing"));
    }
}
