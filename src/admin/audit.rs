/// Audit trail for admin actions
///
/// Writing is best-effort: a failed write is logged and reported as `None`,
/// never as an error, so the action being audited is not undone by a broken
/// audit table.
use crate::{account::AccountView, error::AppResult, rbac::Role};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{sqlite::SqliteRow, types::Json, QueryBuilder, Row, Sqlite, SqlitePool};
use uuid::Uuid;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;
const MOST_ACTIVE_LIMIT: i64 = 5;
const MAX_SUMMARY_DAYS: i64 = 3650;

/// Admin action names. Unknown names read back from storage are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    ApproveUser,
    RejectUser,
    SuspendUser,
    ReactivateUser,
    UpdateUser,
    UpdateUserRole,
    DeleteUser,
    CreateAdmin,
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::ApproveUser => "APPROVE_USER",
            AuditAction::RejectUser => "REJECT_USER",
            AuditAction::SuspendUser => "SUSPEND_USER",
            AuditAction::ReactivateUser => "REACTIVATE_USER",
            AuditAction::UpdateUser => "UPDATE_USER",
            AuditAction::UpdateUserRole => "UPDATE_USER_ROLE",
            AuditAction::DeleteUser => "DELETE_USER",
            AuditAction::CreateAdmin => "CREATE_ADMIN",
            AuditAction::Other(name) => name,
        }
    }
}

impl From<String> for AuditAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "APPROVE_USER" => AuditAction::ApproveUser,
            "REJECT_USER" => AuditAction::RejectUser,
            "SUSPEND_USER" => AuditAction::SuspendUser,
            "REACTIVATE_USER" => AuditAction::ReactivateUser,
            "UPDATE_USER" => AuditAction::UpdateUser,
            "UPDATE_USER_ROLE" => AuditAction::UpdateUserRole,
            "DELETE_USER" => AuditAction::DeleteUser,
            "CREATE_ADMIN" => AuditAction::CreateAdmin,
            _ => AuditAction::Other(s),
        }
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who performed an action. Copied into each entry so the entry survives
/// the actor's deletion or role change.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
}

impl From<&AccountView> for Actor {
    fn from(account: &AccountView) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            role: account.role,
        }
    }
}

/// Where a request came from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Entry about to be written
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub description: Option<String>,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
}

impl NewAuditEntry {
    pub fn new(action: AuditAction) -> Self {
        Self {
            action,
            resource_type: None,
            resource_id: None,
            description: None,
            before_state: None,
            after_state: None,
        }
    }

    pub fn resource(mut self, resource_type: &str, resource_id: impl ToString) -> Self {
        self.resource_type = Some(resource_type.to_string());
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn before(mut self, state: Value) -> Self {
        self.before_state = Some(state);
        self
    }

    pub fn after(mut self, state: Value) -> Self {
        self.after_state = Some(state);
        self
    }
}

/// Stored audit entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i64,
    pub actor_id: Uuid,
    pub actor_email: String,
    pub actor_role: String,
    pub action: AuditAction,
    pub resource_type: Option<String>,
    pub resource_id: Option<String>,
    pub description: Option<String>,
    pub before_state: Option<Value>,
    pub after_state: Option<Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    fn from_row(row: &SqliteRow) -> AppResult<Self> {
        let action: String = row.try_get("action")?;
        let before_state: Option<Json<Value>> = row.try_get("before_state")?;
        let after_state: Option<Json<Value>> = row.try_get("after_state")?;

        Ok(AuditLogEntry {
            id: row.try_get("id")?,
            actor_id: row.try_get("actor_id")?,
            actor_email: row.try_get("actor_email")?,
            actor_role: row.try_get("actor_role")?,
            action: AuditAction::from(action),
            resource_type: row.try_get("resource_type")?,
            resource_id: row.try_get("resource_id")?,
            description: row.try_get("description")?,
            before_state: before_state.map(|Json(v)| v),
            after_state: after_state.map(|Json(v)| v),
            ip_address: row.try_get("ip_address")?,
            user_agent: row.try_get("user_agent")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Audit log filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQuery {
    pub actor_id: Option<Uuid>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditPage {
    pub entries: Vec<AuditLogEntry>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionCount {
    pub action: AuditAction,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActorActivity {
    pub actor_id: Uuid,
    pub actor_email: String,
    pub count: i64,
}

/// Activity over a trailing window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub window_days: i64,
    pub since: DateTime<Utc>,
    pub total: i64,
    pub by_action: Vec<ActionCount>,
    pub most_active: Vec<ActorActivity>,
}

/// Audit trail recorder and reader
pub struct AuditRecorder {
    db: SqlitePool,
}

impl AuditRecorder {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Record an admin action. Returns `None` if the write failed.
    pub async fn record(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        entry: NewAuditEntry,
    ) -> Option<AuditLogEntry> {
        let action = entry.action.clone();

        match self.insert(actor, meta, entry).await {
            Ok(stored) => {
                tracing::info!(
                    "Audit: {} by {} on {:?}",
                    stored.action,
                    stored.actor_email,
                    stored.resource_id
                );
                Some(stored)
            }
            Err(e) => {
                tracing::error!("Failed to write audit entry for {} by {}: {}", action, actor.id, e);
                None
            }
        }
    }

    async fn insert(
        &self,
        actor: &Actor,
        meta: &RequestMeta,
        entry: NewAuditEntry,
    ) -> AppResult<AuditLogEntry> {
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO audit_log (actor_id, actor_email, actor_role, action, resource_type,
                 resource_id, description, before_state, after_state, ip_address, user_agent, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(actor.id)
        .bind(&actor.email)
        .bind(actor.role.as_str())
        .bind(entry.action.as_str())
        .bind(&entry.resource_type)
        .bind(&entry.resource_id)
        .bind(&entry.description)
        .bind(entry.before_state.as_ref().map(Json))
        .bind(entry.after_state.as_ref().map(Json))
        .bind(&meta.ip_address)
        .bind(&meta.user_agent)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(AuditLogEntry {
            id: result.last_insert_rowid(),
            actor_id: actor.id,
            actor_email: actor.email.clone(),
            actor_role: actor.role.as_str().to_string(),
            action: entry.action,
            resource_type: entry.resource_type,
            resource_id: entry.resource_id,
            description: entry.description,
            before_state: entry.before_state,
            after_state: entry.after_state,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: now,
        })
    }

    /// Page through entries, newest first
    pub async fn query(&self, query: &AuditQuery) -> AppResult<AuditPage> {
        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM audit_log WHERE 1 = 1");
        push_audit_filters(&mut count, query);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(
            "SELECT id, actor_id, actor_email, actor_role, action, resource_type, resource_id,
                 description, before_state, after_state, ip_address, user_agent, created_at
             FROM audit_log WHERE 1 = 1",
        );
        push_audit_filters(&mut select, query);
        select
            .push(" ORDER BY created_at DESC, id DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1).saturating_mul(limit));

        let rows = select.build().fetch_all(&self.db).await?;
        let entries = rows
            .iter()
            .map(AuditLogEntry::from_row)
            .collect::<AppResult<Vec<_>>>()?;

        Ok(AuditPage {
            entries,
            total,
            page,
            limit,
        })
    }

    /// Counts per action and the most active actors over the last
    /// `window_days`, clamped to ten years
    pub async fn summary(&self, window_days: i64) -> AppResult<AuditSummary> {
        let window_days = window_days.clamp(1, MAX_SUMMARY_DAYS);
        let since = Utc::now() - Duration::days(window_days);

        let by_action = sqlx::query(
            "SELECT action, COUNT(*) AS count FROM audit_log
             WHERE created_at >= ?1
             GROUP BY action ORDER BY count DESC, action ASC",
        )
        .bind(since)
        .fetch_all(&self.db)
        .await?
        .iter()
        .map(|row| -> AppResult<ActionCount> {
            Ok(ActionCount {
                action: AuditAction::from(row.try_get::<String, _>("action")?),
                count: row.try_get("count")?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

        let most_active = sqlx::query(
            "SELECT actor_id, actor_email, COUNT(*) AS count FROM audit_log
             WHERE created_at >= ?1
             GROUP BY actor_id, actor_email ORDER BY count DESC, actor_email ASC
             LIMIT ?2",
        )
        .bind(since)
        .bind(MOST_ACTIVE_LIMIT)
        .fetch_all(&self.db)
        .await?
        .iter()
        .map(|row| -> AppResult<ActorActivity> {
            Ok(ActorActivity {
                actor_id: row.try_get("actor_id")?,
                actor_email: row.try_get("actor_email")?,
                count: row.try_get("count")?,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

        let total = by_action.iter().map(|c| c.count).sum();

        Ok(AuditSummary {
            window_days,
            since,
            total,
            by_action,
            most_active,
        })
    }
}

fn push_audit_filters(builder: &mut QueryBuilder<'_, Sqlite>, query: &AuditQuery) {
    if let Some(actor_id) = query.actor_id {
        builder.push(" AND actor_id = ").push_bind(actor_id);
    }
    if let Some(action) = &query.action {
        builder.push(" AND action = ").push_bind(action.clone());
    }
    if let Some(from) = query.from {
        builder.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = query.to {
        builder.push(" AND created_at <= ").push_bind(to);
    }
}
