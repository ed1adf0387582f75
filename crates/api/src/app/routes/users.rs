//! User directory endpoints. All of them require a token; creation happens
//! through registration.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};

use libris_core::UserId;

use crate::app::dto::UserResponse;
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/users", get(list))
        .route("/users/:id", get(fetch).delete(delete_user))
}

async fn list(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = services.users.list().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

async fn fetch(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<UserId>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = services
        .users
        .fetch(id)
        .await?
        .ok_or_else(|| ApiError::not_found("user"))?;
    Ok(Json(user.into()))
}

async fn delete_user(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<UserId>,
) -> Result<StatusCode, ApiError> {
    services.users.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
