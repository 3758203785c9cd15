/// API routes and handlers
pub mod admin;
pub mod auth;
pub mod middleware;
pub mod users;

use crate::{
    context::AppContext,
    error::{AppError, AppResult},
    gate::{Gate, RequestContext},
};
use axum::{body::Bytes, extract::Query, http::Uri, Router};
use serde::de::DeserializeOwned;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(auth::routes())
        .merge(users::routes())
        .merge(admin::routes())
}

/// Run a route's gate before any work is done
pub(crate) fn authorize(ctx: &AppContext, gate: &Gate, request: &RequestContext) -> AppResult<()> {
    gate.evaluate(&ctx.registry, request)?;
    Ok(())
}

/// Decode a JSON body. Handlers take the raw bytes and call this after their
/// gate, so unauthorized callers never reach body validation.
pub(crate) fn decode_body<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::Validation(format!("Invalid request body: {}", e)))
}

/// Query-string counterpart of [`decode_body`]
pub(crate) fn decode_query<T: DeserializeOwned>(uri: &Uri) -> AppResult<T> {
    Query::try_from_uri(uri)
        .map(|Query(query)| query)
        .map_err(|e| AppError::Validation(format!("Invalid query string: {}", e.body_text())))
}
