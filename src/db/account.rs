/// Account database models and row decoding
use crate::{
    account::{AccountStatus, AccountView},
    error::{AppError, AppResult},
    rbac::Role,
};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

/// Columns selected whenever a full account row is loaded
pub const ACCOUNT_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, address, \
     date_of_birth, graduation_year, department, occupation, role, status, is_admin, is_active, \
     login_attempts, locked_until, last_login, approved_by, approval_date, created_at, updated_at";

/// Account record in the database
#[derive(Debug, Clone)]
pub struct Account {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
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
    pub is_admin: bool,
    pub is_active: bool,
    pub login_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approval_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Decode a row selected with [`ACCOUNT_COLUMNS`]
    pub fn from_row(row: &SqliteRow) -> AppResult<Self> {
        let role: String = row.try_get("role")?;
        let status: String = row.try_get("status")?;

        Ok(Account {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            date_of_birth: row.try_get("date_of_birth")?,
            graduation_year: row.try_get("graduation_year")?,
            department: row.try_get("department")?,
            occupation: row.try_get("occupation")?,
            role: Role::parse(&role)
                .map_err(|_| AppError::Internal(format!("Stored role is invalid: {}", role)))?,
            status: AccountStatus::parse(&status)
                .map_err(|_| AppError::Internal(format!("Stored status is invalid: {}", status)))?,
            is_admin: row.try_get("is_admin")?,
            is_active: row.try_get("is_active")?,
            login_attempts: row.try_get("login_attempts")?,
            locked_until: row.try_get("locked_until")?,
            last_login: row.try_get("last_login")?,
            approved_by: row.try_get("approved_by")?,
            approval_date: row.try_get("approval_date")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    /// Time left on an active lockout, if any
    pub fn lockout_remaining(&self, now: DateTime<Utc>) -> Option<chrono::Duration> {
        self.locked_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Credential-free view of this account
    pub fn view(&self) -> AccountView {
        AccountView {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            date_of_birth: self.date_of_birth,
            graduation_year: self.graduation_year,
            department: self.department.clone(),
            occupation: self.occupation.clone(),
            role: self.role,
            status: self.status,
            is_admin: self.is_admin,
            is_active: self.is_active,
            last_login: self.last_login,
            approved_by: self.approved_by,
            approval_date: self.approval_date,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
