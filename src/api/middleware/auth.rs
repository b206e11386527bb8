//! Bearer-secret middleware for processing triggers.
//!
//! Expects `Authorization: Bearer <secret>`. The presented value is hashed
//! and compared in constant time against the configured secret's hash.

use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::api::error::ApiError;
use crate::api::types::{hash_token, ApiContext};

/// Require the shared cron secret.
///
/// Reads `ApiContext` from request extensions (injected by an Extension layer).
pub async fn require_cron_secret(req: Request<axum::body::Body>, next: Next) -> Response {
    match check(&req) {
        Ok(()) => next.run(req).await,
        Err(err) => err.into_response(),
    }
}

fn check(req: &Request<axum::body::Body>) -> Result<(), ApiError> {
    let ctx = req
        .extensions()
        .get::<ApiContext>()
        .ok_or(ApiError::Internal("missing API context".into()))?;

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)?;

    let presented = hash_token(token);
    if bool::from(presented[..].ct_eq(&ctx.core.cron_secret_hash()[..])) {
        Ok(())
    } else {
        tracing::warn!(path = %req.uri().path(), "Rejected processing trigger with bad secret");
        Err(ApiError::Unauthorized)
    }
}
