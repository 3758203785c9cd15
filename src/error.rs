/// Unified error types for the membership service
///
/// Every failure a caller may branch on carries a stable [`ErrorCode`]; the
/// human-readable message is informational only.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Stable error codes surfaced in every denial body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Authentication
    MissingToken,
    InvalidTokenFormat,
    TokenExpired,
    InvalidToken,
    TokenVerificationFailed,
    NotAuthenticated,
    InvalidCredentials,
    AccountInactive,
    AccountLocked,
    AccountSuspended,
    AccountNotApproved,
    // Authorization
    InsufficientPermissions,
    // State transitions
    InvalidStatus,
    InvalidRole,
    CannotDemoteSelf,
    CannotDeleteSelf,
    UserNotFound,
    // Input
    ValidationError,
    EmailExists,
    // Infrastructure
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingToken => "MISSING_TOKEN",
            ErrorCode::InvalidTokenFormat => "INVALID_TOKEN_FORMAT",
            ErrorCode::TokenExpired => "TOKEN_EXPIRED",
            ErrorCode::InvalidToken => "INVALID_TOKEN",
            ErrorCode::TokenVerificationFailed => "TOKEN_VERIFICATION_FAILED",
            ErrorCode::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::AccountInactive => "ACCOUNT_INACTIVE",
            ErrorCode::AccountLocked => "ACCOUNT_LOCKED",
            ErrorCode::AccountSuspended => "ACCOUNT_SUSPENDED",
            ErrorCode::AccountNotApproved => "ACCOUNT_NOT_APPROVED",
            ErrorCode::InsufficientPermissions => "INSUFFICIENT_PERMISSIONS",
            ErrorCode::InvalidStatus => "INVALID_STATUS",
            ErrorCode::InvalidRole => "INVALID_ROLE",
            ErrorCode::CannotDemoteSelf => "CANNOT_DEMOTE_SELF",
            ErrorCode::CannotDeleteSelf => "CANNOT_DELETE_SELF",
            ErrorCode::UserNotFound => "USER_NOT_FOUND",
            ErrorCode::ValidationError => "VALIDATION_ERROR",
            ErrorCode::EmailExists => "EMAIL_EXISTS",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Default HTTP status for this code
    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::MissingToken
            | ErrorCode::InvalidTokenFormat
            | ErrorCode::TokenExpired
            | ErrorCode::InvalidToken
            | ErrorCode::TokenVerificationFailed
            | ErrorCode::NotAuthenticated
            | ErrorCode::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorCode::AccountInactive
            | ErrorCode::AccountLocked
            | ErrorCode::AccountSuspended
            | ErrorCode::AccountNotApproved
            | ErrorCode::InsufficientPermissions
            | ErrorCode::CannotDemoteSelf
            | ErrorCode::CannotDeleteSelf => StatusCode::FORBIDDEN,
            ErrorCode::InvalidStatus | ErrorCode::InvalidRole | ErrorCode::ValidationError => {
                StatusCode::BAD_REQUEST
            }
            ErrorCode::UserNotFound => StatusCode::NOT_FOUND,
            ErrorCode::EmailExists => StatusCode::CONFLICT,
            ErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structured refusal: stable code, message, and optional debugging context.
///
/// Serializes as `{ "success": false, "message": ..., "error": CODE, ...context }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub code: ErrorCode,
    pub status: StatusCode,
    pub message: String,
    pub context: Map<String, Value>,
}

impl Denial {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status: code.status(),
            message: message.into(),
            context: Map::new(),
        }
    }

    /// Attach a context field to the denial body
    pub fn with(mut self, key: &str, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.context.insert(key.to_string(), value);
        self
    }

    /// Override the HTTP status (e.g. a vanished token subject is a 401, not a 404)
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn not_authenticated() -> Self {
        Denial::new(ErrorCode::NotAuthenticated, "Authentication required")
    }

    pub fn user_not_found() -> Self {
        Denial::new(ErrorCode::UserNotFound, "User not found")
    }

    /// Response body for this denial
    pub fn body(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".to_string(), Value::Bool(false));
        body.insert("message".to_string(), Value::String(self.message.clone()));
        body.insert("error".to_string(), Value::String(self.code.as_str().to_string()));
        for (key, value) in &self.context {
            body.entry(key.clone()).or_insert_with(|| value.clone());
        }
        Value::Object(body)
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// Main error type for the service
#[derive(Error, Debug)]
pub enum AppError {
    /// Caller-facing refusal carrying a stable code
    #[error("{0}")]
    Denied(Denial),

    /// Input validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Token signing errors
    #[error("JWT error: {0}")]
    Jwt(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable code of this error, if it is a caller-facing one
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Denied(denial) => denial.code,
            AppError::Validation(_) => ErrorCode::ValidationError,
            _ => ErrorCode::InternalError,
        }
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            AppError::Denied(denial) => Some(denial),
            _ => None,
        }
    }
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        AppError::Denied(denial)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let denial = match self {
            AppError::Denied(denial) => denial,
            AppError::Validation(message) => Denial::new(ErrorCode::ValidationError, message),
            other => {
                tracing::error!("Request failed: {}", other);
                // Don't leak details
                Denial::new(ErrorCode::InternalError, "Internal server error")
            }
        };

        (denial.status, Json(denial.body())).into_response()
    }
}

/// Result type alias for service operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denial_body_shape() {
        let denial = Denial::new(ErrorCode::InvalidStatus, "User status is APPROVED")
            .with("currentStatus", "APPROVED");

        let body = denial.body();
        assert_eq!(body["success"], Value::Bool(false));
        assert_eq!(body["error"], "INVALID_STATUS");
        assert_eq!(body["message"], "User status is APPROVED");
        assert_eq!(body["currentStatus"], "APPROVED");
    }

    #[test]
    fn test_context_cannot_override_contract_fields() {
        let denial = Denial::new(ErrorCode::InsufficientPermissions, "nope").with("error", "OTHER");
        assert_eq!(denial.body()["error"], "INSUFFICIENT_PERMISSIONS");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ErrorCode::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::InsufficientPermissions.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorCode::InvalidStatus.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::UserNotFound.status(), StatusCode::NOT_FOUND);

        let overridden = Denial::user_not_found().with_status(StatusCode::UNAUTHORIZED);
        assert_eq!(overridden.status, StatusCode::UNAUTHORIZED);
        assert_eq!(overridden.code, ErrorCode::UserNotFound);
    }

    #[test]
    fn test_code_serialization_matches_as_str() {
        for code in [
            ErrorCode::AccountNotApproved,
            ErrorCode::CannotDemoteSelf,
            ErrorCode::TokenVerificationFailed,
        ] {
            let json = serde_json::to_value(code).unwrap();
            assert_eq!(json, code.as_str());
        }
    }

    #[test]
    fn test_internal_errors_report_generic_code() {
        let err = AppError::Internal("disk on fire".to_string());
        assert_eq!(err.code(), ErrorCode::InternalError);
        assert!(err.denial().is_none());
    }
}
