//! Catalog endpoints for authors. Reads are public; writes require a token.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Extension, Json, Router};

use libris_catalog::NewAuthor;
use libris_core::AuthorId;

use crate::app::dto::{AuthorDetailResponse, AuthorResponse, CreateAuthorRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/authors", get(list).post(create))
        .route("/authors/:id", get(fetch).delete(delete_author))
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<AuthorResponse>>, ApiError> {
    let authors = services.authors.list().await?;
    Ok(Json(authors.into_iter().map(AuthorResponse::from).collect()))
}

async fn fetch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<AuthorId>,
) -> Result<Json<AuthorDetailResponse>, ApiError> {
    let detail = services
        .authors
        .fetch_with_books(id)
        .await?
        .ok_or_else(|| ApiError::not_found("author"))?;
    Ok(Json(detail.into()))
}

async fn create(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<CreateAuthorRequest>,
) -> Result<(StatusCode, Json<AuthorResponse>), ApiError> {
    let new_author = NewAuthor { name: req.name };
    new_author.validate()?;

    let author = services.authors.insert(new_author).await?;
    Ok((StatusCode::CREATED, Json(author.into())))
}

async fn delete_author(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<AuthorId>,
) -> Result<StatusCode, ApiError> {
    services.authors.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::response::IntoResponse;

    use libris_catalog::MockAuthorRepository;
    use libris_core::DomainError;

    use crate::app::test_support::{caller, stub_services};

    fn services_with(authors: MockAuthorRepository) -> Extension<Arc<AppServices>> {
        let mut services = stub_services();
        services.authors = Arc::new(authors);
        Extension(Arc::new(services))
    }

    #[tokio::test]
    async fn missing_author_answers_not_found() {
        let mut authors = MockAuthorRepository::new();
        authors.expect_fetch_with_books().returning(|_| Ok(None));

        let err = fetch(services_with(authors), Path(AuthorId::new()))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn restricted_deletion_surfaces_as_conflict() {
        let mut authors = MockAuthorRepository::new();
        authors
            .expect_delete()
            .returning(|_| Err(DomainError::conflict("author has books")));

        let err = delete_author(caller(), services_with(authors), Path(AuthorId::new()))
            .await
            .unwrap_err();

        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
