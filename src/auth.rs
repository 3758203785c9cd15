/// Bearer tokens and the authentication extractor
use crate::{
    account::AccountView,
    api::middleware::extract_bearer_token,
    context::AppContext,
    error::{AppError, AppResult, Denial, ErrorCode},
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an access token. Only the subject is trusted; the
/// account itself is re-read on every request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    /// Account id named by the token
    pub fn subject(&self) -> Result<Uuid, Denial> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| Denial::new(ErrorCode::InvalidToken, "Token subject is malformed"))
    }
}

/// Issue an HS256 access token for an account
pub fn issue_token(account_id: Uuid, jwt_secret: &str, ttl_secs: i64) -> AppResult<String> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: account_id.to_string(),
        iat: now,
        exp: now + ttl_secs,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Jwt(format!("Failed to sign token: {}", e)))
}

/// Verify signature and expiry of an access token
pub fn verify_token(token: &str, jwt_secret: &str) -> Result<Claims, Denial> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 30;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => Denial::new(ErrorCode::TokenExpired, "Token has expired"),
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => Denial::new(ErrorCode::InvalidToken, "Invalid token"),
            _ => Denial::new(
                ErrorCode::TokenVerificationFailed,
                "Token verification failed",
            ),
        }
    })
}

/// Authenticated caller, resolved from the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: AccountView,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)?;

        let account = state.account_manager.validate_access_token(&token).await?;

        tracing::debug!("Authenticated {} as {}", account.id, account.role);

        Ok(AuthContext { account })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-testing-only-0123456789";

    #[test]
    fn test_issue_and_verify() {
        let id = Uuid::new_v4();
        let token = issue_token(id, SECRET, 3600).unwrap();

        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.subject().unwrap(), id);
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_expired_token() {
        let token = issue_token(Uuid::new_v4(), SECRET, -3600).unwrap();
        let err = verify_token(&token, SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::TokenExpired);
    }

    #[test]
    fn test_wrong_secret() {
        let token = issue_token(Uuid::new_v4(), SECRET, 3600).unwrap();
        let err = verify_token(&token, "another-secret-key-that-is-long-enough").unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_garbage_token() {
        let err = verify_token("definitely.not.ajwt", SECRET).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidToken);
    }

    #[test]
    fn test_malformed_subject() {
        let claims = Claims {
            sub: "not-a-uuid".to_string(),
            iat: 0,
            exp: 0,
        };
        assert_eq!(claims.subject().unwrap_err().code, ErrorCode::InvalidToken);
    }
}
