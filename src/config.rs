/// Configuration management for the membership service
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 7 * 24 * 3600;
pub const DEFAULT_MAX_LOGIN_ATTEMPTS: i64 = 5;
pub const DEFAULT_LOCKOUT_MINUTES: i64 = 120;
pub const MAX_LOCKOUT_MINUTES: i64 = 365 * 24 * 60;
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 3600;
pub const DEFAULT_LOG_FILTER: &str = "alumni_gate=debug,tower_http=debug";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
    /// Lifetime of issued bearer tokens
    pub token_ttl_secs: i64,
    /// Failed logins before the account is locked
    pub max_login_attempts: i64,
    pub lockout_minutes: i64,
    /// First SUPER_ADMIN, seeded at startup when none exists
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directives for the subscriber
    pub level: String,
}

impl ServerConfig {
    /// Configuration with defaults everywhere except the signing secret
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        ServerConfig {
            service: ServiceConfig {
                hostname: "localhost".to_string(),
                port: DEFAULT_PORT,
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            storage: StorageConfig {
                database_path: PathBuf::from("./data/membership.sqlite"),
            },
            authentication: AuthConfig {
                jwt_secret: jwt_secret.into(),
                token_ttl_secs: DEFAULT_TOKEN_TTL_SECS,
                max_login_attempts: DEFAULT_MAX_LOGIN_ATTEMPTS,
                lockout_minutes: DEFAULT_LOCKOUT_MINUTES,
                bootstrap_admin: None,
            },
            logging: LoggingConfig {
                level: DEFAULT_LOG_FILTER.to_string(),
            },
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let jwt_secret = env::var("GATE_JWT_SECRET")
            .map_err(|_| AppError::Validation("JWT secret required".to_string()))?;
        let mut config = ServerConfig::new(jwt_secret);

        if let Ok(hostname) = env::var("GATE_HOSTNAME") {
            config.service.hostname = hostname;
        }
        if let Ok(port) = env::var("GATE_PORT") {
            config.service.port = port
                .parse()
                .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;
        }

        if let Ok(path) = env::var("GATE_DATABASE_PATH") {
            config.storage.database_path = PathBuf::from(path);
        }

        config.authentication.token_ttl_secs = env::var("GATE_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);
        config.authentication.max_login_attempts = env::var("GATE_MAX_LOGIN_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAX_LOGIN_ATTEMPTS);
        config.authentication.lockout_minutes = env::var("GATE_LOCKOUT_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_LOCKOUT_MINUTES);

        config.authentication.bootstrap_admin = match (
            env::var("GATE_BOOTSTRAP_ADMIN_EMAIL"),
            env::var("GATE_BOOTSTRAP_ADMIN_PASSWORD"),
        ) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        if let Ok(level) = env::var("RUST_LOG") {
            config.logging.level = level;
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.jwt_secret.len() < 32 {
            return Err(AppError::Validation(
                "JWT secret must be at least 32 characters".to_string(),
            ));
        }

        if !(1..=MAX_TOKEN_TTL_SECS).contains(&self.authentication.token_ttl_secs) {
            return Err(AppError::Validation(format!(
                "Token lifetime must be between 1 and {} seconds",
                MAX_TOKEN_TTL_SECS
            )));
        }

        if self.authentication.max_login_attempts < 1 {
            return Err(AppError::Validation(
                "At least one login attempt must be allowed".to_string(),
            ));
        }

        if !(1..=MAX_LOCKOUT_MINUTES).contains(&self.authentication.lockout_minutes) {
            return Err(AppError::Validation(format!(
                "Lockout must last between 1 and {} minutes",
                MAX_LOCKOUT_MINUTES
            )));
        }

        if let Some(admin) = &self.authentication.bootstrap_admin {
            if admin.password.len() < 6 {
                return Err(AppError::Validation(
                    "Bootstrap admin password must be at least 6 characters".to_string(),
                ));
            }
        }

        Ok(())
    }
}
