//! Catalog endpoints for books. Reads are public; writes require a token.

use std::sync::Arc;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};

use libris_catalog::{BookPatch, NewBook};
use libris_core::BookId;

use crate::app::dto::{BookDetailResponse, BookResponse, CreateBookRequest, UpdateBookRequest};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/books", get(list).post(create))
        .route("/books/:id", get(fetch).put(update).delete(delete_book))
}

async fn list(
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = services.books.list().await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

async fn fetch(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<BookId>,
) -> Result<Json<BookDetailResponse>, ApiError> {
    let detail = services
        .books
        .fetch_with_author(id)
        .await?
        .ok_or_else(|| ApiError::not_found("book"))?;
    Ok(Json(detail.into()))
}

async fn create(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Json(req): Json<CreateBookRequest>,
) -> Result<(StatusCode, Json<BookResponse>), ApiError> {
    let new_book = NewBook {
        title: req.title,
        isbn: req.isbn,
        publication_year: req.publication_year,
        genre: req.genre,
        stock: req.stock,
        author_id: req.author_id,
    };
    new_book.validate()?;

    let book = services.books.insert(new_book).await?;
    Ok((StatusCode::CREATED, Json(book.into())))
}

async fn update(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<BookId>,
    Json(req): Json<UpdateBookRequest>,
) -> Result<Json<BookResponse>, ApiError> {
    let patch = BookPatch {
        title: req.title,
        isbn: req.isbn,
        publication_year: req.publication_year,
        genre: req.genre,
        author_id: req.author_id,
    };
    patch.validate()?;

    let book = services.books.update(id, patch).await?;
    Ok(Json(book.into()))
}

async fn delete_book(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<BookId>,
) -> Result<StatusCode, ApiError> {
    services.books.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
