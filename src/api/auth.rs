/// Registration, login and identity endpoints
use crate::{
    account::{LoginRequest, LoginResponse, RegisterRequest},
    auth::AuthContext,
    context::AppContext,
    error::AppResult,
};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/me", get(me))
}

/// Self-registration; the account waits for approval
async fn register(
    State(ctx): State<AppContext>,
    Json(request): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let account = ctx.account_manager.register(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration received. Your account is pending approval.",
            "user": account.view(),
        })),
    ))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let (account, token) = ctx
        .account_manager
        .login(&request.email, &request.password)
        .await?;

    Ok(Json(LoginResponse {
        success: true,
        token,
        user: account.view(),
    }))
}

async fn me(auth: AuthContext) -> Json<Value> {
    Json(json!({
        "success": true,
        "user": auth.account,
    }))
}
