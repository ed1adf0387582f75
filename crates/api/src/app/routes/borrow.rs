//! Circulation endpoints: checkout, return, and the two loan listings.
//!
//! Handlers go through the [`LedgerService`], which owns the retry budget
//! for lost serialization races; by the time an error reaches this layer it
//! is final.
//!
//! [`LedgerService`]: libris_infra::LedgerService

use std::sync::Arc;

use axum::extract::Path;
use axum::routing::{get, post};
use axum::{Extension, Json, Router};

use libris_core::{BookId, UserId};

use crate::app::dto::{BorrowConfirmation, HistoryEntryResponse, OpenLoanResponse};
use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/borrow/:user_id/:book_id", post(checkout))
        .route("/borrow/return/:user_id/:book_id", post(return_copy))
        .route("/borrow/borrowed-books", get(open_loans))
        .route("/borrow/user/:user_id/history", get(history))
}

async fn checkout(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path((user_id, book_id)): Path<(UserId, BookId)>,
) -> Result<Json<BorrowConfirmation>, ApiError> {
    let receipt = services.ledger.checkout(user_id, book_id).await?;
    Ok(Json(BorrowConfirmation {
        loan_id: receipt.loan_id,
        message: format!("'{}' borrowed by {}.", receipt.book_title, receipt.username),
    }))
}

async fn return_copy(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path((user_id, book_id)): Path<(UserId, BookId)>,
) -> Result<Json<BorrowConfirmation>, ApiError> {
    let receipt = services.ledger.return_copy(user_id, book_id).await?;
    Ok(Json(BorrowConfirmation {
        loan_id: receipt.loan_id,
        message: format!("'{}' returned by {}.", receipt.book_title, receipt.username),
    }))
}

async fn open_loans(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<Vec<OpenLoanResponse>>, ApiError> {
    let loans = services.ledger.open_loans().await?;
    Ok(Json(loans.into_iter().map(OpenLoanResponse::from).collect()))
}

async fn history(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<Vec<HistoryEntryResponse>>, ApiError> {
    let records = services.ledger.history_for_user(user_id).await?;
    Ok(Json(
        records.into_iter().map(HistoryEntryResponse::from).collect(),
    ))
}
