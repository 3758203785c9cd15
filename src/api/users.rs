/// Profile endpoints, open to the account itself and to admins
use crate::{
    account::ProfileUpdate,
    admin::{Actor, RequestMeta},
    api::{authorize, decode_body},
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
    gate::{Check, Gate, RequestContext},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use uuid::Uuid;

pub fn routes() -> Router<AppContext> {
    Router::new().route("/api/users/:id", get(get_profile).put(update_profile))
}

async fn get_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    Path(id): Path<Uuid>,
) -> AppResult<Json<Value>> {
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(&ctx, &Gate::new().require(Check::Ownership("profile")), &request)?;

    let account = ctx.account_manager.get_account(id).await?;

    Ok(Json(json!({
        "success": true,
        "user": account.view(),
    })))
}

async fn update_profile(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    meta: RequestMeta,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> AppResult<Json<Value>> {
    let actor = Actor::from(&auth.account);
    let request = RequestContext::new(auth.account).with_target(id);
    authorize(
        &ctx,
        &Gate::new().require(Check::SelfOrAdmin).require(Check::Approved),
        &request,
    )?;

    let update: ProfileUpdate = decode_body(&body)?;
    let account = ctx.lifecycle.update_profile(&actor, &meta, id, &update).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Profile updated",
        "user": account,
    })))
}
