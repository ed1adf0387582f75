//! Registration and token issuance.
//!
//! Both endpoints are public. bcrypt work runs on a blocking worker; the
//! async executor threads never hash. Credential failures all collapse into
//! one generic 401 so responses cannot reveal which accounts exist.

use std::sync::Arc;

use axum::http::StatusCode;
use axum::{Extension, Json, Router, routing::post};
use chrono::Utc;

use libris_auth::{Role, TokenService, hash_password, verify_credentials};
use libris_catalog::NewUser;

use crate::app::dto::{RegisterRequest, TokenRequest, TokenResponse, UserResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;

pub fn router() -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/token", post(token))
}

async fn register(
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let new_user = NewUser {
        username: req.username,
        email: req.email,
        firstname: req.firstname,
        lastname: req.lastname,
        password_hash,
        role: Role::member(),
    };
    new_user.validate()?;

    let user = services.users.insert(new_user).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tokens): Extension<Arc<TokenService>>,
    Json(req): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = services.users.fetch_by_login(&req.username).await?;

    // A missing account and a wrong password fall through the same
    // verification call and get the same generic rejection; the response
    // never reveals whether the account exists.
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let presented = req.password;
    tokio::task::spawn_blocking(move || verify_credentials(stored.as_ref(), &presented))
        .await
        .map_err(|e| ApiError::internal(e.to_string()))??;

    let user = user.ok_or_else(ApiError::invalid_credentials)?;
    let access_token = tokens.issue(user.id, &user.username, user.role.clone(), Utc::now())?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "bearer",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::response::IntoResponse;
    use chrono::Duration;

    use libris_catalog::MockUserRepository;
    use libris_core::DomainError;

    use crate::app::test_support::stub_services;

    fn services_with(users: MockUserRepository) -> Extension<Arc<AppServices>> {
        let mut services = stub_services();
        services.users = Arc::new(users);
        Extension(Arc::new(services))
    }

    fn token_service() -> Extension<Arc<TokenService>> {
        Extension(Arc::new(TokenService::new(
            b"test-secret",
            Duration::minutes(30),
        )))
    }

    #[tokio::test]
    async fn unknown_account_is_rejected_with_the_generic_401() {
        let mut users = MockUserRepository::new();
        users.expect_fetch_by_login().returning(|_| Ok(None));

        let err = token(
            services_with(users),
            token_service(),
            Json(TokenRequest {
                username: "nobody".to_string(),
                password: "battery staple".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn duplicate_registration_surfaces_as_conflict() {
        let mut users = MockUserRepository::new();
        users
            .expect_insert()
            .returning(|_| Err(DomainError::conflict("username already exists")));

        let err = register(
            services_with(users),
            Json(RegisterRequest {
                username: "maria".to_string(),
                email: "maria@example.com".to_string(),
                firstname: "Maria".to_string(),
                lastname: "Rivera".to_string(),
                password: "correct horse".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn invalid_registration_never_reaches_storage() {
        // No expectations: any call into the mock fails the test.
        let users = MockUserRepository::new();

        let err = register(
            services_with(users),
            Json(RegisterRequest {
                username: "maria".to_string(),
                email: "not-an-email".to_string(),
                firstname: "Maria".to_string(),
                lastname: "Rivera".to_string(),
                password: "correct horse".to_string(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
