//! The authorization gate.
//!
//! Handlers for mutating endpoints take a [`CurrentUser`] argument; the
//! extractor pulls the bearer token, decodes it, and rejects with a generic
//! 401 before any handler logic or storage access runs. Public endpoints
//! simply omit the argument.

use std::sync::Arc;

use axum::{async_trait, extract::FromRequestParts, http::HeaderMap, http::request::Parts};
use chrono::Utc;

use libris_auth::{Claims, TokenService};

use crate::app::errors::ApiError;

/// The authenticated caller, decoded from the bearer token.
///
/// No endpoint currently restricts by role beyond "is authenticated"; the
/// claims (including role) are available should a handler need them.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Claims);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let tokens = parts
            .extensions
            .get::<Arc<TokenService>>()
            .ok_or_else(|| ApiError::internal("token service not wired"))?;

        let token = extract_bearer(&parts.headers)?;
        let claims = tokens
            .decode(token, Utc::now())
            .map_err(|_| ApiError::unauthenticated())?;

        Ok(CurrentUser(claims))
    }
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, ApiError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(ApiError::unauthenticated)?;

    let header = header.to_str().map_err(|_| ApiError::unauthenticated())?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(ApiError::unauthenticated)?
        .trim();
    if token.is_empty() {
        return Err(ApiError::unauthenticated());
    }

    Ok(token)
}
