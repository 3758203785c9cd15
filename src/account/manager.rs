/// Account manager implementation using runtime queries
use crate::{
    account::{AccountPage, AccountQuery, AccountStatus, AccountView, ProfileUpdate, RegisterRequest},
    auth,
    config::ServerConfig,
    db::account::{Account, ACCOUNT_COLUMNS},
    error::{AppResult, Denial, ErrorCode},
    password,
    rbac::Role,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Fields for a row about to be inserted
#[derive(Debug, Clone)]
pub(crate) struct NewAccount {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub graduation_year: Option<i32>,
    pub department: Option<String>,
    pub occupation: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub approved_by: Option<Uuid>,
}

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    /// Create a new account manager
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    pub fn db(&self) -> &SqlitePool {
        &self.db
    }

    /// Self-registration. The account always lands as USER / PENDING.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<Account> {
        request.validate()?;

        let account = self
            .insert_account(NewAccount {
                email: request.email,
                password: request.password,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone: Some(request.phone),
                address: Some(request.address),
                date_of_birth: Some(request.date_of_birth),
                graduation_year: Some(request.graduation_year),
                department: Some(request.department),
                occupation: request.occupation,
                role: Role::User,
                status: AccountStatus::Pending,
                approved_by: None,
            })
            .await?;

        tracing::info!("Registered account {} ({}), awaiting approval", account.id, account.email);

        Ok(account)
    }

    /// Insert an account row. `is_admin` is derived from the role here and
    /// nowhere else.
    pub(crate) async fn insert_account(&self, new: NewAccount) -> AppResult<Account> {
        let email = normalize_email(&new.email);

        if self.email_exists(&email).await? {
            return Err(Denial::new(ErrorCode::EmailExists, "Email already registered").into());
        }

        let password_hash = password::hash(&new.password)?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let approval_date = new.approved_by.map(|_| now);

        sqlx::query(
            "INSERT INTO account (id, email, password_hash, first_name, last_name, phone, address,
                 date_of_birth, graduation_year, department, occupation, role, status, is_admin,
                 is_active, login_attempts, approved_by, approval_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 1, 0, ?15, ?16, ?17, ?17)",
        )
        .bind(id)
        .bind(&email)
        .bind(&password_hash)
        .bind(&new.first_name)
        .bind(&new.last_name)
        .bind(&new.phone)
        .bind(&new.address)
        .bind(new.date_of_birth)
        .bind(new.graduation_year)
        .bind(&new.department)
        .bind(&new.occupation)
        .bind(new.role.as_str())
        .bind(new.status.as_str())
        .bind(new.role.is_admin_tier())
        .bind(new.approved_by)
        .bind(approval_date)
        .bind(now)
        .execute(&self.db)
        .await?;

        self.get_account(id).await
    }

    /// Authenticate with email and password, returning the account and a
    /// fresh bearer token.
    ///
    /// Wrong passwords count towards a lockout; the counter is bumped in SQL
    /// so concurrent failures are not lost.
    pub async fn login(&self, email: &str, password: &str) -> AppResult<(Account, String)> {
        let now = Utc::now();

        let Some(mut account) = self.find_by_email(email).await? else {
            tracing::warn!("Login failed: unknown email");
            return Err(invalid_credentials().into());
        };

        ensure_active(&account)?;
        ensure_unlocked(&account, now)?;

        if account.locked_until.is_some() {
            // Lockout has run out: start counting from zero again
            sqlx::query(
                "UPDATE account SET login_attempts = 0, locked_until = NULL WHERE id = ?1",
            )
            .bind(account.id)
            .execute(&self.db)
            .await?;
            account.login_attempts = 0;
            account.locked_until = None;
        }

        if !password::verify(password, &account.password_hash)? {
            return Err(self.record_failed_login(&account, now).await?.into());
        }

        ensure_approved(&account)?;

        sqlx::query(
            "UPDATE account SET login_attempts = 0, locked_until = NULL, last_login = ?1 WHERE id = ?2",
        )
        .bind(now)
        .bind(account.id)
        .execute(&self.db)
        .await?;

        let account = self.get_account(account.id).await?;
        let token = self.issue_token(account.id)?;

        tracing::info!("Account {} logged in", account.id);

        Ok((account, token))
    }

    /// Count a failed login and lock the account once the threshold is hit.
    /// Returns the denial to report to the caller.
    async fn record_failed_login(&self, account: &Account, now: DateTime<Utc>) -> AppResult<Denial> {
        let auth_config = &self.config.authentication;
        let lock_until = now + Duration::minutes(auth_config.lockout_minutes);

        let row = sqlx::query(
            "UPDATE account
             SET login_attempts = login_attempts + 1,
                 locked_until = CASE WHEN login_attempts + 1 >= ?1 THEN ?2 ELSE locked_until END,
                 updated_at = ?3
             WHERE id = ?4
             RETURNING login_attempts, locked_until",
        )
        .bind(auth_config.max_login_attempts)
        .bind(lock_until)
        .bind(now)
        .bind(account.id)
        .fetch_one(&self.db)
        .await?;

        let attempts: i64 = row.try_get("login_attempts")?;
        let locked_until: Option<DateTime<Utc>> = row.try_get("locked_until")?;

        tracing::warn!("Failed login for account {} (attempt {})", account.id, attempts);

        if let Some(until) = locked_until.filter(|until| *until > now) {
            tracing::warn!("Account {} locked until {}", account.id, until);
            return Ok(locked_denial(until, until - now));
        }

        Ok(invalid_credentials()
            .with("attemptsRemaining", (auth_config.max_login_attempts - attempts).max(0)))
    }

    /// Issue a bearer token for an account
    pub fn issue_token(&self, account_id: Uuid) -> AppResult<String> {
        auth::issue_token(
            account_id,
            &self.config.authentication.jwt_secret,
            self.config.authentication.token_ttl_secs,
        )
    }

    /// Resolve a bearer token to the account it was issued for.
    ///
    /// The account is re-read on every call; nothing but its id is trusted
    /// from the token. Admins are exempt from the approval requirement.
    pub async fn validate_access_token(&self, token: &str) -> AppResult<AccountView> {
        let claims = auth::verify_token(token, &self.config.authentication.jwt_secret)?;

        let account = self
            .find_account(claims.subject()?)
            .await?
            .ok_or_else(|| {
                Denial::user_not_found().with_status(axum::http::StatusCode::UNAUTHORIZED)
            })?;

        ensure_active(&account)?;
        ensure_unlocked(&account, Utc::now())?;
        ensure_approved(&account)?;

        Ok(account.view())
    }

    /// Get account by id, if it exists
    pub async fn find_account(&self, id: Uuid) -> AppResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM account WHERE id = ?1", ACCOUNT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(Account::from_row).transpose()
    }

    /// Get account by id; USER_NOT_FOUND if missing
    pub async fn get_account(&self, id: Uuid) -> AppResult<Account> {
        self.find_account(id)
            .await?
            .ok_or_else(|| Denial::user_not_found().into())
    }

    /// Get account by email (case-insensitive)
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<Account>> {
        let row = sqlx::query(&format!("SELECT {} FROM account WHERE email = ?1", ACCOUNT_COLUMNS))
            .bind(normalize_email(email))
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(Account::from_row).transpose()
    }

    /// Check if email exists
    pub async fn email_exists(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE email = ?1")
            .bind(normalize_email(email))
            .fetch_one(&self.db)
            .await?;

        Ok(count > 0)
    }

    /// Apply a profile update. Never touches role, status or the admin flag.
    pub async fn update_profile(&self, id: Uuid, update: &ProfileUpdate) -> AppResult<Account> {
        update.validate()?;

        let result = sqlx::query(
            "UPDATE account
             SET first_name = COALESCE(?1, first_name),
                 last_name = COALESCE(?2, last_name),
                 phone = COALESCE(?3, phone),
                 address = COALESCE(?4, address),
                 graduation_year = COALESCE(?5, graduation_year),
                 department = COALESCE(?6, department),
                 occupation = COALESCE(?7, occupation),
                 updated_at = ?8
             WHERE id = ?9",
        )
        .bind(update.first_name.as_deref().map(str::trim))
        .bind(update.last_name.as_deref().map(str::trim))
        .bind(&update.phone)
        .bind(&update.address)
        .bind(update.graduation_year)
        .bind(&update.department)
        .bind(&update.occupation)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(Denial::user_not_found().into());
        }

        self.get_account(id).await
    }

    /// List accounts, newest first, optionally filtered by status and role
    pub async fn list_accounts(&self, query: &AccountQuery) -> AppResult<AccountPage> {
        let status = query
            .status
            .as_deref()
            .map(AccountStatus::parse)
            .transpose()?;
        let role = query.role.as_deref().map(Role::parse).transpose()?;

        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM account WHERE 1 = 1");
        push_account_filters(&mut count, status, role);
        let total: i64 = count.build_query_scalar().fetch_one(&self.db).await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM account WHERE 1 = 1",
            ACCOUNT_COLUMNS
        ));
        push_account_filters(&mut select, status, role);
        select
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind((page - 1).saturating_mul(limit));

        let rows = select.build().fetch_all(&self.db).await?;
        let accounts = rows
            .iter()
            .map(|row| Account::from_row(row).map(|a| a.view()))
            .collect::<AppResult<Vec<_>>>()?;

        Ok(AccountPage {
            accounts,
            total,
            page,
            limit,
        })
    }

    /// All admin-tier accounts, oldest first
    pub async fn list_admins(&self) -> AppResult<Vec<AccountView>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account WHERE is_admin = 1 ORDER BY created_at ASC",
            ACCOUNT_COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter()
            .map(|row| Account::from_row(row).map(|a| a.view()))
            .collect()
    }

    /// Seed the configured SUPER_ADMIN if no SUPER_ADMIN exists yet
    pub async fn ensure_bootstrap_admin(&self) -> AppResult<Option<Account>> {
        let Some(bootstrap) = self.config.authentication.bootstrap_admin.clone() else {
            return Ok(None);
        };

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM account WHERE role = ?1")
            .bind(Role::SuperAdmin.as_str())
            .fetch_one(&self.db)
            .await?;

        if existing > 0 {
            tracing::debug!("Super admin already present, skipping bootstrap");
            return Ok(None);
        }

        let account = self
            .insert_account(NewAccount {
                email: bootstrap.email,
                password: bootstrap.password,
                first_name: "Super".to_string(),
                last_name: "Admin".to_string(),
                phone: None,
                address: None,
                date_of_birth: None,
                graduation_year: None,
                department: None,
                occupation: None,
                role: Role::SuperAdmin,
                status: AccountStatus::Approved,
                approved_by: None,
            })
            .await?;

        tracing::info!("Bootstrapped super admin {}", account.email);

        Ok(Some(account))
    }
}

fn push_account_filters(
    builder: &mut QueryBuilder<'_, Sqlite>,
    status: Option<AccountStatus>,
    role: Option<Role>,
) {
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(role) = role {
        builder.push(" AND role = ").push_bind(role.as_str());
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> Denial {
    Denial::new(ErrorCode::InvalidCredentials, "Invalid email or password")
}

fn locked_denial(until: DateTime<Utc>, remaining: Duration) -> Denial {
    // Round up so a lock with seconds left never reports zero minutes
    let minutes = (remaining.num_seconds() + 59) / 60;

    Denial::new(
        ErrorCode::AccountLocked,
        format!("Account is locked. Try again in {} minutes", minutes),
    )
    .with("lockedUntil", until)
    .with("lockoutRemainingMinutes", minutes)
}

fn ensure_active(account: &Account) -> Result<(), Denial> {
    if !account.is_active {
        return Err(Denial::new(ErrorCode::AccountInactive, "Account is deactivated"));
    }
    Ok(())
}

fn ensure_unlocked(account: &Account, now: DateTime<Utc>) -> Result<(), Denial> {
    match (account.locked_until, account.lockout_remaining(now)) {
        (Some(until), Some(remaining)) => Err(locked_denial(until, remaining)),
        _ => Ok(()),
    }
}

/// Non-admins must be APPROVED; admins always pass so they can operate
fn ensure_approved(account: &Account) -> Result<(), Denial> {
    if account.is_admin {
        return Ok(());
    }

    match account.status {
        AccountStatus::Approved => Ok(()),
        AccountStatus::Suspended => Err(Denial::new(
            ErrorCode::AccountSuspended,
            "Account is suspended",
        )
        .with("currentStatus", account.status)),
        status => Err(Denial::new(
            ErrorCode::AccountNotApproved,
            "Account is awaiting approval or was rejected",
        )
        .with("currentStatus", status)),
    }
}
