/// Account lifecycle: status transitions, role changes, admin creation and
/// deletion, each recorded in the audit trail.
///
/// Every status transition is a conditional update on the status that was
/// read, so two admins racing on the same account cannot both succeed.
use crate::{
    account::{
        AccountManager, AccountStatus, AccountView, CreateAdminRequest, NewAccount, ProfileUpdate,
    },
    admin::audit::{Actor, AuditAction, AuditRecorder, NewAuditEntry, RequestMeta},
    db::account::Account,
    error::{AppError, AppResult, Denial, ErrorCode},
    rbac::Role,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const USER_RESOURCE: &str = "user";

/// Per-item outcome of a batch operation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub success: Vec<Uuid>,
    pub failed: Vec<BatchFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    /// The id as submitted, which may not be a well-formed UUID
    pub id: String,
    pub reason: String,
}

pub struct AccountLifecycle {
    accounts: Arc<AccountManager>,
    audit: Arc<AuditRecorder>,
}

impl AccountLifecycle {
    pub fn new(accounts: Arc<AccountManager>, audit: Arc<AuditRecorder>) -> Self {
        Self { accounts, audit }
    }

    /// PENDING -> APPROVED, stamping the approver
    pub async fn approve(&self, actor: &Actor, meta: &RequestMeta, target: Uuid) -> AppResult<AccountView> {
        let (before, after) = self
            .transition(target, Some(AccountStatus::Pending), AccountStatus::Approved, Some(actor.id))
            .await?;

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(AuditAction::ApproveUser)
                    .resource(USER_RESOURCE, target)
                    .description(format!("Approved {}", after.email))
                    .before(status_snapshot(&before))
                    .after(status_snapshot(&after)),
            )
            .await;

        Ok(after.view())
    }

    /// PENDING -> REJECTED
    pub async fn reject(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        target: Uuid,
        reason: Option<&str>,
    ) -> AppResult<AccountView> {
        let (before, after) = self
            .transition(target, Some(AccountStatus::Pending), AccountStatus::Rejected, None)
            .await?;

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(AuditAction::RejectUser)
                    .resource(USER_RESOURCE, target)
                    .description(with_reason(format!("Rejected {}", after.email), reason))
                    .before(status_snapshot(&before))
                    .after(status_snapshot(&after)),
            )
            .await;

        Ok(after.view())
    }

    /// APPROVED -> SUSPENDED
    pub async fn suspend(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        target: Uuid,
        reason: Option<&str>,
    ) -> AppResult<AccountView> {
        let (before, after) = self
            .transition(target, Some(AccountStatus::Approved), AccountStatus::Suspended, None)
            .await?;

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(AuditAction::SuspendUser)
                    .resource(USER_RESOURCE, target)
                    .description(with_reason(format!("Suspended {}", after.email), reason))
                    .before(status_snapshot(&before))
                    .after(status_snapshot(&after)),
            )
            .await;

        Ok(after.view())
    }

    /// Direct status update. Any valid status may follow any other; the
    /// audit label is inferred from the transition.
    pub async fn update_status(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        target: Uuid,
        status: &str,
    ) -> AppResult<AccountView> {
        let status = AccountStatus::parse(status)?;

        let (before, after) = self.transition(target, None, status, None).await?;
        let action = status_action(before.status, after.status);

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(action)
                    .resource(USER_RESOURCE, target)
                    .description(format!(
                        "Changed status of {} from {} to {}",
                        after.email, before.status, after.status
                    ))
                    .before(status_snapshot(&before))
                    .after(status_snapshot(&after)),
            )
            .await;

        Ok(after.view())
    }

    /// Change an account's role. SUPER_ADMIN only; a SUPER_ADMIN may not
    /// demote itself.
    pub async fn change_role(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        target: Uuid,
        role: &str,
    ) -> AppResult<AccountView> {
        require_super_admin(actor)?;
        let role = Role::parse(role)?;

        if target == actor.id && role != Role::SuperAdmin {
            return Err(Denial::new(ErrorCode::CannotDemoteSelf, "You cannot demote yourself")
                .with("currentRole", actor.role)
                .into());
        }

        let before = self.accounts.get_account(target).await?;

        let result = sqlx::query(
            "UPDATE account SET role = ?1, is_admin = ?2, updated_at = ?3 WHERE id = ?4",
        )
        .bind(role.as_str())
        .bind(role.is_admin_tier())
        .bind(Utc::now())
        .bind(target)
        .execute(self.accounts.db())
        .await?;

        if result.rows_affected() == 0 {
            return Err(Denial::user_not_found().into());
        }

        let after = self.accounts.get_account(target).await?;

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(AuditAction::UpdateUserRole)
                    .resource(USER_RESOURCE, target)
                    .description(format!(
                        "Changed role of {} from {} to {}",
                        after.email, before.role, after.role
                    ))
                    .before(role_snapshot(&before))
                    .after(role_snapshot(&after)),
            )
            .await;

        Ok(after.view())
    }

    /// Create an admin-tier account, already approved. SUPER_ADMIN only.
    pub async fn create_admin(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        request: CreateAdminRequest,
    ) -> AppResult<AccountView> {
        require_super_admin(actor)?;
        request.validate()?;

        let role = Role::parse(&request.role)?;
        if !role.is_admin_tier() {
            return Err(Denial::new(ErrorCode::InvalidRole, "Role must be an admin role")
                .with("validRoles", Role::ADMIN_TIERS)
                .into());
        }

        let account = self
            .accounts
            .insert_account(NewAccount {
                email: request.email,
                password: request.password,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone: None,
                address: None,
                date_of_birth: None,
                graduation_year: None,
                department: None,
                occupation: None,
                role,
                status: AccountStatus::Approved,
                approved_by: Some(actor.id),
            })
            .await?;

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(AuditAction::CreateAdmin)
                    .resource(USER_RESOURCE, account.id)
                    .description(format!("Created {} admin {}", account.role, account.email))
                    .after(full_snapshot(&account)),
            )
            .await;

        Ok(account.view())
    }

    /// Delete an account. SUPER_ADMIN only, never the caller's own.
    pub async fn delete_account(&self, actor: &Actor, meta: &RequestMeta, target: Uuid) -> AppResult<()> {
        require_super_admin(actor)?;

        if target == actor.id {
            return Err(
                Denial::new(ErrorCode::CannotDeleteSelf, "You cannot delete your own account").into(),
            );
        }

        let before = self.accounts.get_account(target).await?;

        let result = sqlx::query("DELETE FROM account WHERE id = ?1")
            .bind(target)
            .execute(self.accounts.db())
            .await?;

        if result.rows_affected() == 0 {
            return Err(Denial::user_not_found().into());
        }

        self.audit
            .record(
                actor,
                meta,
                NewAuditEntry::new(AuditAction::DeleteUser)
                    .resource(USER_RESOURCE, target)
                    .description(format!("Deleted {}", before.email))
                    .before(full_snapshot(&before)),
            )
            .await;

        Ok(())
    }

    /// Update another account's profile on its behalf. Self-edits are not
    /// audited; edits by someone else are.
    pub async fn update_profile(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        target: Uuid,
        update: &ProfileUpdate,
    ) -> AppResult<AccountView> {
        let before = self.accounts.get_account(target).await?;
        let after = self.accounts.update_profile(target, update).await?;

        if actor.id != target {
            self.audit
                .record(
                    actor,
                    meta,
                    NewAuditEntry::new(AuditAction::UpdateUser)
                        .resource(USER_RESOURCE, target)
                        .description(format!("Updated profile of {}", after.email))
                        .before(full_snapshot(&before))
                        .after(full_snapshot(&after)),
                )
                .await;
        }

        Ok(after.view())
    }

    /// Approve each id independently; failures do not stop the batch
    pub async fn batch_approve(&self, actor: &Actor, meta: &RequestMeta, ids: &[String]) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for raw in ids {
            let Some(id) = outcome.parse_id(raw) else {
                continue;
            };
            let result = self.approve(actor, meta, id).await;
            outcome.push(raw, id, result);
        }
        outcome
    }

    /// Reject each id independently; failures do not stop the batch
    pub async fn batch_reject(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        ids: &[String],
        reason: Option<&str>,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        for raw in ids {
            let Some(id) = outcome.parse_id(raw) else {
                continue;
            };
            let result = self.reject(actor, meta, id, reason).await;
            outcome.push(raw, id, result);
        }
        outcome
    }

    /// Move `target` to `to`. With `expected` set, the account must currently
    /// be in that status; otherwise whatever status was read is the
    /// precondition. Returns the account before and after.
    async fn transition(
        &self,
        target: Uuid,
        expected: Option<AccountStatus>,
        to: AccountStatus,
        approver: Option<Uuid>,
    ) -> AppResult<(Account, Account)> {
        let before = self.accounts.get_account(target).await?;
        let from = expected.unwrap_or(before.status);

        if before.status != from {
            return Err(invalid_status(before.status).into());
        }

        let now = Utc::now();
        let result = match approver {
            Some(approver) => {
                sqlx::query(
                    "UPDATE account SET status = ?1, approved_by = ?2, approval_date = ?3, updated_at = ?3
                     WHERE id = ?4 AND status = ?5",
                )
                .bind(to.as_str())
                .bind(approver)
                .bind(now)
                .bind(target)
                .bind(from.as_str())
                .execute(self.accounts.db())
                .await?
            }
            None => {
                sqlx::query(
                    "UPDATE account SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
                )
                .bind(to.as_str())
                .bind(now)
                .bind(target)
                .bind(from.as_str())
                .execute(self.accounts.db())
                .await?
            }
        };

        if result.rows_affected() == 0 {
            // Someone else changed or removed the account since it was read
            let current = self.accounts.get_account(target).await?;
            tracing::warn!(
                "Status change of {} to {} lost a race (now {})",
                target,
                to,
                current.status
            );
            return Err(invalid_status(current.status).into());
        }

        let after = self.accounts.get_account(target).await?;
        tracing::info!("Account {} moved from {} to {}", target, before.status, after.status);

        Ok((before, after))
    }
}

impl BatchOutcome {
    /// A malformed id cannot name an account, so it fails as not found
    fn parse_id(&mut self, raw: &str) -> Option<Uuid> {
        match Uuid::parse_str(raw.trim()) {
            Ok(id) => Some(id),
            Err(_) => {
                self.failed.push(BatchFailure {
                    id: raw.to_string(),
                    reason: Denial::user_not_found().message,
                });
                None
            }
        }
    }

    fn push(&mut self, raw: &str, id: Uuid, result: AppResult<AccountView>) {
        match result {
            Ok(_) => self.success.push(id),
            Err(AppError::Denied(denial)) => self.failed.push(BatchFailure {
                id: raw.to_string(),
                reason: denial.message,
            }),
            Err(e) => {
                tracing::error!("Batch item {} failed: {}", id, e);
                self.failed.push(BatchFailure {
                    id: raw.to_string(),
                    reason: "Internal error".to_string(),
                });
            }
        }
    }
}

fn require_super_admin(actor: &Actor) -> Result<(), Denial> {
    if actor.role == Role::SuperAdmin {
        Ok(())
    } else {
        Err(
            Denial::new(ErrorCode::InsufficientPermissions, "Super admin access required")
                .with("requiredRoles", [Role::SuperAdmin])
                .with("currentRole", actor.role),
        )
    }
}

fn invalid_status(current: AccountStatus) -> Denial {
    Denial::new(ErrorCode::InvalidStatus, format!("User status is {}", current))
        .with("currentStatus", current)
}

/// Audit label for a direct status update
fn status_action(from: AccountStatus, to: AccountStatus) -> AuditAction {
    match (from, to) {
        (_, AccountStatus::Suspended) => AuditAction::SuspendUser,
        (AccountStatus::Suspended, AccountStatus::Approved) => AuditAction::ReactivateUser,
        _ => AuditAction::UpdateUser,
    }
}

fn with_reason(description: String, reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|r| !r.is_empty()) {
        Some(reason) => format!("{}: {}", description, reason),
        None => description,
    }
}

fn status_snapshot(account: &Account) -> Value {
    json!({
        "status": account.status,
        "approvedBy": account.approved_by,
        "approvalDate": account.approval_date,
    })
}

fn role_snapshot(account: &Account) -> Value {
    json!({
        "role": account.role,
        "isAdmin": account.is_admin,
    })
}

fn full_snapshot(account: &Account) -> Value {
    serde_json::to_value(account.view()).unwrap_or(Value::Null)
}
