/// Admin API endpoints
///
/// Each handler evaluates its gate before decoding input or touching storage.
use crate::{
    account::{AccountQuery, AccountStatus, CreateAdminRequest},
    admin::{audit::AuditQuery, Actor, RequestMeta},
    api::{authorize, decode_body, decode_query},
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    gate::{Check, Gate, RequestContext},
    rbac::{permission, Permission},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, Uri},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

const DEFAULT_SUMMARY_DAYS: i64 = 30;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/admin/users", get(list_users))
        .route("/api/admin/users/pending", get(list_pending))
        .route("/api/admin/users/batch/approve", post(batch_approve))
        .route("/api/admin/users/batch/reject", post(batch_reject))
        .route("/api/admin/users/:id", delete(delete_user))
        .route("/api/admin/users/:id/approve", put(approve_user))
        .route("/api/admin/users/:id/reject", put(reject_user))
        .route("/api/admin/users/:id/suspend", put(suspend_user))
        .route("/api/admin/users/:id/status", put(update_status))
        .route("/api/admin/users/:id/role", put(change_role))
        .route("/api/admin/admins", get(list_admins).post(create_admin))
        .route("/api/admin/audit-logs", get(list_audit_logs))
        .route("/api/admin/audit-logs/summary", get(audit_summary))
}

/// Admin flag plus every listed permission
fn admin_gate(permissions: &[Permission]) -> Gate {
    Gate::new()
        .require(Check::Admin)
        .require(Check::Permissions(permissions.to_vec()))
}

fn super_admin_gate() -> Gate {
    Gate::new().require(Check::Admin).require(Check::SuperAdmin)
}

#[derive(Debug, Deserialize)]
struct ReasonBody {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: String,
}

#[derive(Debug, Deserialize)]
struct RoleBody {
    role: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchBody {
    user_ids: Vec<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SummaryQuery {
    days: Option<i64>,
}

async fn list_users(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    uri: Uri,
) -> AppResult<Json<Value>> {
    authorize(&ctx, &admin_gate(&[permission::VIEW_USERS]), &RequestContext::new(auth.account))?;

    let query: AccountQuery = decode_query(&uri)?;
    let page = ctx.account_manager.list_accounts(&query).await?;

    Ok(Json(json!({ "success": true, "data": page })))
}

async fn list_pending(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    uri: Uri,
) -> AppResult<Json<Value>> {
    authorize(&ctx, &admin_gate(&[permission::VIEW_USERS]), &RequestContext::new(auth.account))?;

    let mut query: AccountQuery = decode_query(&uri)?;
    query.status = Some(AccountStatus::Pending.as_str().to_string());
    let page = ctx.account_manager.list_accounts(&query).await?;

    Ok(Json(json!({ "success": true, "data": page })))
}

async fn approve_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(&ctx, &admin_gate(&[permission::APPROVE_USER]), &request)?;

    let user = ctx.lifecycle.approve(&actor, &meta, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User approved",
        "user": user,
    })))
}

async fn reject_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    body: Option<Json<ReasonBody>>,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(&ctx, &admin_gate(&[permission::REJECT_USER]), &request)?;

    let reason = body.and_then(|Json(body)| body.reason);
    let user = ctx
        .lifecycle
        .reject(&actor, &meta, id, reason.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "User rejected",
        "user": user,
    })))
}

async fn suspend_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    body: Option<Json<ReasonBody>>,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(&ctx, &admin_gate(&[permission::SUSPEND_USER]), &request)?;

    let reason = body.and_then(|Json(body)| body.reason);
    let user = ctx
        .lifecycle
        .suspend(&actor, &meta, id, reason.as_deref())
        .await?;

    Ok(Json(json!({
        "success": true,
        "message": "User suspended",
        "user": user,
    })))
}

async fn update_status(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(&ctx, &admin_gate(&[permission::UPDATE_USER]), &request)?;

    let body: StatusBody = decode_body(&body)?;
    let user = ctx.lifecycle.update_status(&actor, &meta, id, &body.status).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User status updated",
        "user": user,
    })))
}

async fn change_role(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(&ctx, &super_admin_gate(), &request)?;

    let body: RoleBody = decode_body(&body)?;
    let user = ctx.lifecycle.change_role(&actor, &meta, id, &body.role).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User role updated",
        "user": user,
    })))
}

async fn delete_user(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(
        &ctx,
        &super_admin_gate().require(Check::Permissions(vec![permission::DELETE_USER])),
        &request,
    )?;

    ctx.lifecycle.delete_account(&actor, &meta, id).await?;

    Ok(Json(json!({
        "success": true,
        "message": "User deleted",
    })))
}

async fn batch_approve(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    authorize(&ctx, &admin_gate(&[permission::APPROVE_USER]), &RequestContext::new(auth.account))?;

    let body: BatchBody = decode_body(&body)?;
    let outcome = ctx.lifecycle.batch_approve(&actor, &meta, &body.user_ids).await;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Approved {} of {} users",
            outcome.success.len(),
            body.user_ids.len()
        ),
        "results": outcome,
    })))
}

async fn batch_reject(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    authorize(&ctx, &admin_gate(&[permission::REJECT_USER]), &RequestContext::new(auth.account))?;

    let body: BatchBody = decode_body(&body)?;
    let outcome = ctx
        .lifecycle
        .batch_reject(&actor, &meta, &body.user_ids, body.reason.as_deref())
        .await;

    Ok(Json(json!({
        "success": true,
        "message": format!(
            "Rejected {} of {} users",
            outcome.success.len(),
            body.user_ids.len()
        ),
        "results": outcome,
    })))
}

async fn list_admins(State(ctx): State<AppContext>, auth: AuthContext) -> AppResult<Json<Value>> {
    authorize(&ctx, &admin_gate(&[permission::VIEW_ADMINS]), &RequestContext::new(auth.account))?;

    let admins = ctx.account_manager.list_admins().await?;

    Ok(Json(json!({ "success": true, "admins": admins })))
}

async fn create_admin(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    body: Bytes,
) -> AppResult<(StatusCode, Json<Value>)> {
    let actor = Actor::from(&auth.account);
    authorize(
        &ctx,
        &super_admin_gate().require(Check::Permissions(vec![permission::CREATE_ADMIN])),
        &RequestContext::new(auth.account),
    )?;

    let body: CreateAdminRequest = decode_body(&body)?;
    let admin = ctx.lifecycle.create_admin(&actor, &meta, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Admin created",
            "admin": admin,
        })),
    ))
}

async fn list_audit_logs(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    uri: Uri,
) -> AppResult<Json<Value>> {
    authorize(&ctx, &admin_gate(&[permission::VIEW_AUDIT_LOGS]), &RequestContext::new(auth.account))?;

    let query: AuditQuery = decode_query(&uri)?;
    let page = ctx.audit.query(&query).await?;

    Ok(Json(json!({ "success": true, "data": page })))
}

async fn audit_summary(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    uri: Uri,
) -> AppResult<Json<Value>> {
    authorize(&ctx, &admin_gate(&[permission::VIEW_AUDIT_LOGS]), &RequestContext::new(auth.account))?;

    let query: SummaryQuery = decode_query(&uri)?;
    let summary = ctx
        .audit
        .summary(query.days.unwrap_or(DEFAULT_SUMMARY_DAYS))
        .await?;

    Ok(Json(json!({ "success": true, "data": summary })))
}
