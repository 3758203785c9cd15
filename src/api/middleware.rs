/// Request header helpers and the request-metadata extractor
use crate::{
    admin::audit::RequestMeta,
    error::{Denial, ErrorCode},
};
use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, HeaderMap},
};
use std::{convert::Infallible, net::SocketAddr};

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, Denial> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| Denial::new(ErrorCode::MissingToken, "Missing authorization header"))?;

    let invalid_format = || {
        Denial::new(
            ErrorCode::InvalidTokenFormat,
            "Authorization header must be 'Bearer <token>'",
        )
    };

    let value = value.to_str().map_err(|_| invalid_format())?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => Err(invalid_format()),
    }
}

/// Caller origin: first X-Forwarded-For hop, then X-Real-IP, then the socket
pub fn client_origin(parts: &Parts) -> Option<String> {
    let forwarded = parts
        .headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let real_ip = || {
        parts
            .headers
            .get("x-real-ip")
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .map(str::to_string)
        .or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip().to_string())
        })
}

pub fn client_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for RequestMeta {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta {
            ip_address: client_origin(parts),
            user_agent: client_agent(&parts.headers),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request};

    fn headers(auth: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(auth).unwrap());
        headers
    }

    #[test]
    fn test_extract_bearer_token() {
        assert_eq!(extract_bearer_token(&headers("Bearer abc.def")).unwrap(), "abc.def");

        let missing = extract_bearer_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(missing.code, ErrorCode::MissingToken);

        for bad in ["Basic dXNlcjpwYXNz", "Bearer ", "bearer abc", "abc"] {
            let err = extract_bearer_token(&headers(bad)).unwrap_err();
            assert_eq!(err.code, ErrorCode::InvalidTokenFormat, "{}", bad);
        }
    }

    #[test]
    fn test_client_origin_prefers_forwarded_for() {
        let (parts, _) = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .header("x-real-ip", "10.0.0.2")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(client_origin(&parts).as_deref(), Some("203.0.113.7"));
    }

    #[test]
    fn test_client_origin_falls_back_to_socket() {
        let (mut parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(client_origin(&parts), None);

        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 4], 5000))));
        assert_eq!(client_origin(&parts).as_deref(), Some("198.51.100.4"));
    }
}
