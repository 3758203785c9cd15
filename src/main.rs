/// Alumni Gate server binary
use alumni_gate::{config::ServerConfig, context::AppContext, error::AppResult, server};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Loaded first so RUST_LOG from .env reaches the filter
    let config = ServerConfig::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.logging.level))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let ctx = AppContext::new(config).await?;

    if let Some(admin) = ctx.account_manager.ensure_bootstrap_admin().await? {
        tracing::info!("Seeded super admin {}", admin.email);
    }

    tracing::info!(
        "Alumni gate v{} starting with {} permissions registered",
        env!("CARGO_PKG_VERSION"),
        ctx.registry.universe().len()
    );

    server::serve(ctx).await?;

    Ok(())
}
