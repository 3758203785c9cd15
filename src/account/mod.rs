/// Account management
///
/// Handles registration, login with lockout, profile reads/updates and
/// account listings. Status and role transitions live in
/// [`crate::admin::lifecycle`].

mod manager;

pub use manager::AccountManager;
pub(crate) use manager::NewAccount;

use crate::error::{Denial, ErrorCode};
use crate::rbac::Role;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Standing of an account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Registered, waiting for an admin decision
    #[default]
    Pending,
    Approved,
    Rejected,
    Suspended,
}

impl AccountStatus {
    pub const ALL: [AccountStatus; 4] = [
        AccountStatus::Pending,
        AccountStatus::Approved,
        AccountStatus::Rejected,
        AccountStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Pending => "PENDING",
            AccountStatus::Approved => "APPROVED",
            AccountStatus::Rejected => "REJECTED",
            AccountStatus::Suspended => "SUSPENDED",
        }
    }

    /// Parse a status name. The set is closed: anything else is INVALID_STATUS.
    pub fn parse(s: &str) -> Result<Self, Denial> {
        AccountStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| {
                Denial::new(ErrorCode::InvalidStatus, format!("Invalid status: {}", s))
                    .with("validStatuses", AccountStatus::ALL.map(|s| s.as_str()))
            })
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account as exposed to callers: no credential, no lockout bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
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
    pub last_login: Option<DateTime<Utc>>,
    pub approved_by: Option<Uuid>,
    pub approval_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Self-registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    #[validate(length(min = 7, max = 20, message = "A valid phone number is required"))]
    pub phone: String,
    #[validate(length(min = 1, max = 255, message = "Address is required"))]
    pub address: String,
    pub date_of_birth: NaiveDate,
    #[validate(range(min = 1950, max = 2100, message = "Graduation year is out of range"))]
    pub graduation_year: i32,
    #[validate(length(min = 1, max = 100, message = "Department is required"))]
    pub department: String,
    #[validate(length(max = 100))]
    pub occupation: Option<String>,
}

/// Admin-creation request. Only these fields are read; anything else in the
/// payload is ignored.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAdminRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, max = 100, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required"))]
    pub last_name: String,
    /// Must name one of the admin tiers
    pub role: String,
}

/// Login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub user: AccountView,
}

/// Profile fields an account (or an admin on its behalf) may change.
///
/// Role, status and the admin flag are deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub last_name: Option<String>,
    #[validate(length(min = 7, max = 20))]
    pub phone: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    #[validate(range(min = 1950, max = 2100))]
    pub graduation_year: Option<i32>,
    #[validate(length(min = 1, max = 100))]
    pub department: Option<String>,
    #[validate(length(max = 100))]
    pub occupation: Option<String>,
}

/// Account listing filters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountQuery {
    pub status: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// One page of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountPage {
    pub accounts: Vec<AccountView>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse() {
        for status in AccountStatus::ALL {
            assert_eq!(AccountStatus::parse(status.as_str()).unwrap(), status);
        }

        let err = AccountStatus::parse("ACTIVE").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidStatus);
        assert!(AccountStatus::parse("approved").is_err());
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(AccountStatus::default(), AccountStatus::Pending);
    }

    #[test]
    fn test_register_request_validation() {
        let mut request = RegisterRequest {
            email: "ada@alumni.example".to_string(),
            password: "secret1".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            phone: "+15550100".to_string(),
            address: "12 Analytical Row".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 12, 10).unwrap(),
            graduation_year: 2012,
            department: "Mathematics".to_string(),
            occupation: None,
        };
        assert!(request.validate().is_ok());

        request.password = "12345".to_string();
        assert!(request.validate().is_err());

        request.password = "secret1".to_string();
        request.email = "not-an-email".to_string();
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_profile_update_ignores_privileged_fields() {
        let update: ProfileUpdate = serde_json::from_value(serde_json::json!({
            "firstName": "Grace",
            "role": "SUPER_ADMIN",
            "status": "APPROVED",
            "isAdmin": true
        }))
        .unwrap();

        assert_eq!(update.first_name.as_deref(), Some("Grace"));
        assert!(update.validate().is_ok());
    }
}
