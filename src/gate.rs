/// Authorization gate
///
/// A [`Gate`] is an ordered list of [`Check`]s evaluated against an immutable
/// [`RequestContext`]. Evaluation stops at the first failing check, so the
/// caller sees exactly one denial. Every check is also available on its own
/// through [`Check::evaluate`].
use crate::{
    account::{AccountStatus, AccountView},
    error::{Denial, ErrorCode},
    rbac::{Permission, PermissionRegistry, Role},
};
use uuid::Uuid;

/// Everything the checks may look at. Built once per request and never
/// mutated by the gate.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Authenticated caller, if the identity check succeeded
    pub account: Option<AccountView>,
    /// Id of the account the request acts upon, when the route names one
    pub target_id: Option<Uuid>,
}

impl RequestContext {
    pub fn new(account: AccountView) -> Self {
        Self {
            account: Some(account),
            target_id: None,
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_target(mut self, target_id: Uuid) -> Self {
        self.target_id = Some(target_id);
        self
    }

    fn caller(&self) -> Result<&AccountView, Denial> {
        self.account.as_ref().ok_or_else(Denial::not_authenticated)
    }
}

/// A single authorization predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    /// Caller has been identified
    Authenticated,
    /// Caller carries the admin flag
    Admin,
    /// Caller's role is exactly one of these
    Roles(Vec<Role>),
    /// Caller is SUPER_ADMIN
    SuperAdmin,
    /// Caller's role grants every listed permission
    Permissions(Vec<Permission>),
    /// Caller's role grants at least one listed permission
    AnyPermission(Vec<Permission>),
    /// Caller owns the target resource (or is an admin); the label names
    /// the resource in the denial message
    Ownership(&'static str),
    /// Caller is the target account or an admin
    SelfOrAdmin,
    /// Caller is APPROVED; admins get no exemption here
    Approved,
}

impl Check {
    /// Evaluate this check on its own
    pub fn evaluate(&self, registry: &PermissionRegistry, ctx: &RequestContext) -> Result<(), Denial> {
        let caller = ctx.caller()?;

        match self {
            Check::Authenticated => Ok(()),
            Check::Admin => {
                if caller.is_admin {
                    Ok(())
                } else {
                    Err(insufficient("Admin access required", caller))
                }
            }
            Check::Roles(allowed) => {
                if allowed.contains(&caller.role) {
                    Ok(())
                } else {
                    Err(insufficient("Your role does not allow this action", caller)
                        .with("requiredRoles", allowed))
                }
            }
            Check::SuperAdmin => {
                if caller.role == Role::SuperAdmin {
                    Ok(())
                } else {
                    Err(insufficient("Super admin access required", caller)
                        .with("requiredRoles", [Role::SuperAdmin]))
                }
            }
            Check::Permissions(required) => {
                if registry.has_all_permissions(caller.role, required) {
                    Ok(())
                } else {
                    Err(insufficient("Missing required permissions", caller)
                        .with("requiredPermissions", required))
                }
            }
            Check::AnyPermission(candidates) => {
                if registry.has_any_permission(caller.role, candidates) {
                    Ok(())
                } else {
                    Err(insufficient("Missing required permissions", caller)
                        .with("requiredPermissions", candidates))
                }
            }
            Check::Ownership(resource) => {
                if caller.is_admin || ctx.target_id == Some(caller.id) {
                    Ok(())
                } else {
                    Err(insufficient(
                        &format!("You can only access your own {}", resource),
                        caller,
                    ))
                }
            }
            Check::SelfOrAdmin => {
                if caller.is_admin || ctx.target_id == Some(caller.id) {
                    Ok(())
                } else {
                    Err(insufficient("You can only act on your own account", caller))
                }
            }
            Check::Approved => {
                if caller.status == AccountStatus::Approved {
                    Ok(())
                } else {
                    Err(Denial::new(
                        ErrorCode::AccountNotApproved,
                        "Account is not approved",
                    )
                    .with("currentStatus", caller.status))
                }
            }
        }
    }
}

fn insufficient(message: &str, caller: &AccountView) -> Denial {
    Denial::new(ErrorCode::InsufficientPermissions, message).with("currentRole", caller.role)
}

/// Ordered, short-circuiting composition of checks
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    checks: Vec<Check>,
}

impl Gate {
    /// A gate that only requires an identified caller
    pub fn new() -> Self {
        Self {
            checks: vec![Check::Authenticated],
        }
    }

    pub fn require(mut self, check: Check) -> Self {
        self.checks.push(check);
        self
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Run every check in declared order; the first failure wins
    pub fn evaluate(&self, registry: &PermissionRegistry, ctx: &RequestContext) -> Result<(), Denial> {
        for check in &self.checks {
            if let Err(denial) = check.evaluate(registry, ctx) {
                tracing::debug!(
                    "Gate denied {:?} at {:?}: {}",
                    ctx.account.as_ref().map(|a| a.id),
                    check,
                    denial.code
                );
                return Err(denial);
            }
        }
        Ok(())
    }
}

impl Default for Gate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::permission;
    use chrono::Utc;

    fn account(role: Role, status: AccountStatus) -> AccountView {
        let now = Utc::now();
        AccountView {
            id: Uuid::new_v4(),
            email: format!("{}@alumni.example", role.as_str().to_lowercase()),
            first_name: "Gate".to_string(),
            last_name: "Tester".to_string(),
            phone: None,
            address: None,
            date_of_birth: None,
            graduation_year: None,
            department: None,
            occupation: None,
            role,
            status,
            is_admin: role.is_admin_tier(),
            is_active: true,
            last_login: None,
            approved_by: None,
            approval_date: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn registry() -> PermissionRegistry {
        PermissionRegistry::standard()
    }

    #[test]
    fn test_anonymous_is_not_authenticated() {
        let err = Gate::new()
            .require(Check::Admin)
            .evaluate(&registry(), &RequestContext::anonymous())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotAuthenticated);
        assert_eq!(err.status, axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_admin_check() {
        let registry = registry();
        let member = RequestContext::new(account(Role::Member, AccountStatus::Approved));
        let admin = RequestContext::new(account(Role::ContentAdmin, AccountStatus::Approved));

        assert!(Check::Admin.evaluate(&registry, &admin).is_ok());
        let err = Check::Admin.evaluate(&registry, &member).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientPermissions);
        assert_eq!(err.context["currentRole"], "MEMBER");
    }

    #[test]
    fn test_exact_roles_have_no_hierarchy() {
        let registry = registry();
        let super_admin = RequestContext::new(account(Role::SuperAdmin, AccountStatus::Approved));
        let check = Check::Roles(vec![Role::MemberAdmin]);

        let err = check.evaluate(&registry, &super_admin).unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientPermissions);
        assert_eq!(err.context["requiredRoles"], serde_json::json!(["MEMBER_ADMIN"]));
        assert_eq!(err.context["currentRole"], "SUPER_ADMIN");
    }

    #[test]
    fn test_permission_checks() {
        let registry = registry();
        let member_admin = RequestContext::new(account(Role::MemberAdmin, AccountStatus::Approved));

        let all = Check::Permissions(vec![permission::APPROVE_USER, permission::VIEW_USERS]);
        assert!(all.evaluate(&registry, &member_admin).is_ok());

        let missing = Check::Permissions(vec![permission::APPROVE_USER, permission::DELETE_USER]);
        let err = missing.evaluate(&registry, &member_admin).unwrap_err();
        assert_eq!(
            err.context["requiredPermissions"],
            serde_json::json!(["approve_user", "delete_user"])
        );

        let any = Check::AnyPermission(vec![permission::DELETE_USER, permission::VIEW_USERS]);
        assert!(any.evaluate(&registry, &member_admin).is_ok());

        // Empty lists: "all of nothing" holds, "any of nothing" does not
        assert!(Check::Permissions(vec![]).evaluate(&registry, &member_admin).is_ok());
        assert!(Check::AnyPermission(vec![]).evaluate(&registry, &member_admin).is_err());
    }

    #[test]
    fn test_super_admin_passes_every_permission_check() {
        let registry = registry();
        let ctx = RequestContext::new(account(Role::SuperAdmin, AccountStatus::Approved));

        let check = Check::Permissions(permission::ALL.to_vec());
        assert!(check.evaluate(&registry, &ctx).is_ok());
    }

    #[test]
    fn test_self_or_admin() {
        let registry = registry();
        let member = account(Role::Member, AccountStatus::Approved);
        let own = RequestContext::new(member.clone()).with_target(member.id);
        let other = RequestContext::new(member).with_target(Uuid::new_v4());
        let admin = RequestContext::new(account(Role::NewsletterAdmin, AccountStatus::Approved))
            .with_target(Uuid::new_v4());

        assert!(Check::SelfOrAdmin.evaluate(&registry, &own).is_ok());
        assert!(Check::SelfOrAdmin.evaluate(&registry, &admin).is_ok());
        assert_eq!(
            Check::SelfOrAdmin.evaluate(&registry, &other).unwrap_err().code,
            ErrorCode::InsufficientPermissions
        );
    }

    #[test]
    fn test_ownership_without_target_fails_closed() {
        let registry = registry();
        let ctx = RequestContext::new(account(Role::Member, AccountStatus::Approved));

        let err = Check::Ownership("profile").evaluate(&registry, &ctx).unwrap_err();
        assert_eq!(err.message, "You can only access your own profile");
    }

    #[test]
    fn test_approved_check() {
        let registry = registry();
        let pending = RequestContext::new(account(Role::User, AccountStatus::Pending));
        let suspended_admin =
            RequestContext::new(account(Role::MemberAdmin, AccountStatus::Suspended));
        let approved = RequestContext::new(account(Role::Member, AccountStatus::Approved));

        let err = Check::Approved.evaluate(&registry, &pending).unwrap_err();
        assert_eq!(err.code, ErrorCode::AccountNotApproved);
        assert_eq!(err.context["currentStatus"], "PENDING");
        assert!(Check::Approved.evaluate(&registry, &suspended_admin).is_err());
        assert!(Check::Approved.evaluate(&registry, &approved).is_ok());
    }

    #[test]
    fn test_gate_stops_at_first_failure() {
        let registry = registry();
        let ctx = RequestContext::new(account(Role::Member, AccountStatus::Approved));

        let gate = Gate::new()
            .require(Check::Admin)
            .require(Check::SuperAdmin)
            .require(Check::Permissions(vec![permission::DELETE_USER]));
        assert_eq!(gate.checks().len(), 4);

        let err = gate.evaluate(&registry, &ctx).unwrap_err();
        assert_eq!(err.message, "Admin access required");
    }
}
