//! Shared fixtures for integration tests
#![allow(dead_code)]

use alumni_gate::{
    account::{AccountView, CreateAdminRequest, RegisterRequest},
    admin::{Actor, RequestMeta},
    config::{BootstrapAdmin, ServerConfig},
    db,
    rbac::{PermissionRegistry, Role},
    AppContext,
};
use chrono::NaiveDate;

pub const SECRET: &str = "integration-secret-key-0123456789abcdef";
pub const PASSWORD: &str = "hunter22";

/// Context over a fresh in-memory database, plus the seeded super admin
pub async fn setup() -> (AppContext, AccountView) {
    let pool = db::connect_in_memory().await.unwrap();

    let mut config = ServerConfig::new(SECRET);
    config.authentication.bootstrap_admin = Some(BootstrapAdmin {
        email: "root@alumni.example".to_string(),
        password: PASSWORD.to_string(),
    });

    let ctx = AppContext::with_pool(config, pool, PermissionRegistry::standard());
    let root = ctx
        .account_manager
        .ensure_bootstrap_admin()
        .await
        .unwrap()
        .unwrap()
        .view();

    (ctx, root)
}

pub fn actor(account: &AccountView) -> Actor {
    Actor::from(account)
}

pub fn meta() -> RequestMeta {
    RequestMeta {
        ip_address: Some("198.51.100.20".to_string()),
        user_agent: Some("lifecycle-tests".to_string()),
    }
}

pub fn registration(email: &str) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        password: PASSWORD.to_string(),
        first_name: "Ngozi".to_string(),
        last_name: "Okafor".to_string(),
        phone: "+2348000000".to_string(),
        address: "4 Campus Avenue".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1993, 3, 14).unwrap(),
        graduation_year: 2015,
        department: "Chemical Engineering".to_string(),
        occupation: None,
    }
}

/// Self-registered account, still PENDING
pub async fn register(ctx: &AppContext, email: &str) -> AccountView {
    ctx.account_manager
        .register(registration(email))
        .await
        .unwrap()
        .view()
}

/// Self-registered account approved by `by`
pub async fn approved_member(ctx: &AppContext, by: &AccountView, email: &str) -> AccountView {
    let pending = register(ctx, email).await;
    ctx.lifecycle
        .approve(&actor(by), &meta(), pending.id)
        .await
        .unwrap()
}

pub async fn create_admin(ctx: &AppContext, root: &AccountView, email: &str, role: Role) -> AccountView {
    ctx.lifecycle
        .create_admin(
            &actor(root),
            &meta(),
            CreateAdminRequest {
                email: email.to_string(),
                password: PASSWORD.to_string(),
                first_name: "Admin".to_string(),
                last_name: role.as_str().to_string(),
                role: role.as_str().to_string(),
            },
        )
        .await
        .unwrap()
}

pub async fn audit_count(ctx: &AppContext) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM audit_log")
        .fetch_one(&ctx.db)
        .await
        .unwrap()
}
