//! Public-key authentication for the protected public routes.
//!
//! Accepts `Authorization: Bearer <key>` or `x-api-key: <key>`. Keys are compared by
//! SHA-256 digest.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::api::handlers::AppState;
use crate::core::config::PublicConfig;
use crate::core::error::Result;
use crate::core::AppError;

/// Hash an API key using SHA-256.
pub fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the provided key; `x-api-key` takes priority over the bearer token.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .or_else(|| extract_bearer(headers))
        .map(str::trim)
        .filter(|k| !k.is_empty())
}

/// Extract Bearer token from Authorization header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

/// Check the request headers against the public API settings.
///
/// * disabled ⇒ `Forbidden`
/// * no key configured ⇒ open
/// * otherwise the provided key must match ⇒ `Unauthorized` on mismatch
pub fn check_public_key(headers: &HeaderMap, config: &PublicConfig) -> Result<()> {
    if !config.enabled {
        return Err(AppError::Forbidden("Public API is disabled".to_string()));
    }

    let expected = match config.key.as_deref().map(str::trim) {
        Some(key) if !key.is_empty() => key,
        _ => return Ok(()),
    };

    let provided = extract_api_key(headers).ok_or(AppError::Unauthorized)?;
    if hash_key(provided) == hash_key(expected) {
        Ok(())
    } else {
        tracing::debug!("Public key mismatch");
        Err(AppError::Unauthorized)
    }
}

/// Middleware guarding public POST routes.
pub async fn verify_public_key(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response> {
    check_public_key(request.headers(), &state.config.public)?;
    Ok(next.run(request).await)
}
