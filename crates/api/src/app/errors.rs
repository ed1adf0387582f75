//! Error mapping at the handler boundary.
//!
//! Every domain failure becomes a stable `{ "code", "message" }` pair.
//! Storage and integrity details are logged here and never leak to clients;
//! authentication failures stay generic so responses cannot be used to
//! enumerate accounts.

use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use libris_auth::AuthError;
use libris_core::DomainError;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn unauthenticated() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "authentication required",
        )
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "unauthenticated",
            "invalid credentials",
        )
    }

    pub fn not_found(entity: &str) -> Self {
        Self::new(
            StatusCode::NOT_FOUND,
            "not_found",
            format!("{entity} not found"),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "validation_error", message)
    }

    pub fn internal(detail: impl AsRef<str>) -> Self {
        tracing::error!(detail = detail.as_ref(), "internal failure");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "internal error",
        )
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => Self::validation(msg),
            DomainError::NotFound { entity } => Self::not_found(entity),
            DomainError::Conflict(msg) => Self::new(StatusCode::CONFLICT, "conflict", msg),
            DomainError::OutOfStock => Self::new(
                StatusCode::BAD_REQUEST,
                "out_of_stock",
                "no copies available",
            ),
            DomainError::Concurrency(_) => Self::new(
                StatusCode::CONFLICT,
                "concurrency_conflict",
                "the operation conflicted with a concurrent request; retry",
            ),
            // Already logged with context where detected; clients get a
            // generic internal failure.
            DomainError::Integrity(detail) | DomainError::Store(detail) => Self::internal(detail),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => Self::invalid_credentials(),
            AuthError::InvalidToken | AuthError::ExpiredToken => Self::unauthenticated(),
            AuthError::TokenEncoding(detail) | AuthError::Hashing(detail) => {
                Self::internal(detail)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(json!({
                "code": self.code,
                "message": self.message,
            })),
        )
            .into_response()
    }
}
