/// Application context and dependency injection
use crate::{
    account::AccountManager,
    admin::{AccountLifecycle, AuditRecorder},
    config::ServerConfig,
    db,
    error::AppResult,
    rbac::PermissionRegistry,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub registry: Arc<PermissionRegistry>,
    pub account_manager: Arc<AccountManager>,
    pub lifecycle: Arc<AccountLifecycle>,
    pub audit: Arc<AuditRecorder>,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        let db = db::create_pool(&config.storage.database_path, db::DatabaseOptions::default()).await?;
        db::run_migrations(&db).await?;
        db::test_connection(&db).await?;

        Ok(Self::with_pool(config, db, PermissionRegistry::standard()))
    }

    /// Wire services over an existing, migrated pool
    pub fn with_pool(config: ServerConfig, db: SqlitePool, registry: PermissionRegistry) -> Self {
        let config = Arc::new(config);
        let account_manager = Arc::new(AccountManager::new(db.clone(), config.clone()));
        let audit = Arc::new(AuditRecorder::new(db.clone()));
        let lifecycle = Arc::new(AccountLifecycle::new(account_manager.clone(), audit.clone()));

        Self {
            config,
            db,
            registry: Arc::new(registry),
            account_manager,
            lifecycle,
            audit,
        }
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
