//! Ledger transactions against Postgres.
//!
//! Both mutations run inside one transaction and take `SELECT ... FOR
//! UPDATE` on the book row, so concurrent checkouts and returns on the same
//! book serialize at the database. The stock decrement is additionally
//! conditioned on `stock > 0` at write time; a zero-row update under the
//! lock means the invariant machinery itself failed and is reported as an
//! integrity fault.
//!
//! Serialization failures and deadlocks surface as `Concurrency` through
//! the error mapping; the [`LedgerService`](crate::LedgerService) retries
//! those with a bounded budget.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row};
use tracing::instrument;

use libris_circulation::{
    CheckoutReceipt, LedgerRepository, Loan, LoanRecord, OpenLoanRecord, ReturnReceipt,
    resolve_open_loan,
};
use libris_core::{BookId, DomainError, DomainResult, LoanId, UserId};

use crate::error::map_sqlx_error;

use super::{LoanRow, PostgresLibrary, decode_row};

#[async_trait]
impl LedgerRepository for PostgresLibrary {
    #[instrument(skip(self), fields(user_id = %user_id, book_id = %book_id), err)]
    async fn checkout(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<CheckoutReceipt> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("checkout_begin", e))?;

        // Row lock for the duration of the transaction: serializes
        // concurrent checkouts/returns per book.
        let book = sqlx::query("SELECT title, stock FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("checkout_lock_book", e))?;

        let Some(book) = book else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("checkout_rollback", e))?;
            return Err(DomainError::not_found("book"));
        };
        let title: String = decode_row("checkout_lock_book", book.try_get("title"))?;
        let stock: i32 = decode_row("checkout_lock_book", book.try_get("stock"))?;

        if stock <= 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("checkout_rollback", e))?;
            return Err(DomainError::OutOfStock);
        }

        let user = sqlx::query("SELECT username FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("checkout_fetch_user", e))?;
        let Some(user) = user else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("checkout_rollback", e))?;
            return Err(DomainError::not_found("user"));
        };
        let username: String = decode_row("checkout_fetch_user", user.try_get("username"))?;

        let loan_id = LoanId::new();
        sqlx::query(
            "INSERT INTO borrowed_books (id, user_id, book_id, borrowed_at) \
             VALUES ($1, $2, $3, $4)",
        )
        .bind(loan_id.as_uuid())
        .bind(user_id.as_uuid())
        .bind(book_id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("checkout_insert_loan", e))?;

        // `stock > 0` is a second line of defense behind the row lock.
        let updated = sqlx::query("UPDATE books SET stock = stock - 1 WHERE id = $1 AND stock > 0")
            .bind(book_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("checkout_decrement", e))?;
        if updated.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("checkout_rollback", e))?;
            return Err(DomainError::integrity(format!(
                "stock for book {book_id} changed under the row lock"
            )));
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("checkout_commit", e))?;

        Ok(CheckoutReceipt {
            loan_id,
            book_title: title,
            username,
            borrowed_at: now,
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id, book_id = %book_id), err)]
    async fn return_copy(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<ReturnReceipt> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("return_begin", e))?;

        let rows = sqlx::query(
            "SELECT id, user_id, book_id, borrowed_at, returned_at FROM borrowed_books \
             WHERE user_id = $1 AND book_id = $2 AND returned_at IS NULL \
             ORDER BY borrowed_at ASC",
        )
        .bind(user_id.as_uuid())
        .bind(book_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("return_find_open", e))?;

        let mut open: Vec<Loan> = Vec::with_capacity(rows.len());
        for row in rows {
            open.push(decode_row("return_find_open", LoanRow::from_row(&row))?.into());
        }
        let loan = match resolve_open_loan(open) {
            Ok(loan) => loan,
            Err(err) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("return_rollback", e))?;
                return Err(err);
            }
        };

        let book = sqlx::query("SELECT title FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("return_lock_book", e))?;
        let Some(book) = book else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("return_rollback", e))?;
            return Err(DomainError::integrity(format!(
                "open loan {} references missing book {book_id}",
                loan.id
            )));
        };
        let title: String = decode_row("return_lock_book", book.try_get("title"))?;

        let user = sqlx::query("SELECT username FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("return_fetch_user", e))?;
        let Some(user) = user else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("return_rollback", e))?;
            return Err(DomainError::integrity(format!(
                "open loan {} references missing user {user_id}",
                loan.id
            )));
        };
        let username: String = decode_row("return_fetch_user", user.try_get("username"))?;

        // Conditional close: if a concurrent return already closed this
        // loan, the re-evaluated WHERE matches nothing and this return
        // reports "open loan" not found, same as a plain double-return.
        let closed = sqlx::query(
            "UPDATE borrowed_books SET returned_at = $2 \
             WHERE id = $1 AND returned_at IS NULL",
        )
        .bind(loan.id.as_uuid())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("return_close_loan", e))?;
        if closed.rows_affected() == 0 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("return_rollback", e))?;
            return Err(DomainError::not_found("open loan"));
        }

        sqlx::query("UPDATE books SET stock = stock + 1 WHERE id = $1")
            .bind(book_id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("return_increment", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("return_commit", e))?;

        Ok(ReturnReceipt {
            loan_id: loan.id,
            book_title: title,
            username,
            returned_at: now,
        })
    }

    async fn open_loans(&self) -> DomainResult<Vec<OpenLoanRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT bb.id, b.title AS book_title, u.firstname, u.lastname, bb.borrowed_at
            FROM borrowed_books bb
            JOIN books b ON b.id = bb.book_id
            JOIN users u ON u.id = bb.user_id
            WHERE bb.returned_at IS NULL
            ORDER BY bb.borrowed_at ASC
            "#,
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("open_loans", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: uuid::Uuid = decode_row("open_loans", row.try_get("id"))?;
            let book_title: String = decode_row("open_loans", row.try_get("book_title"))?;
            let firstname: String = decode_row("open_loans", row.try_get("firstname"))?;
            let lastname: String = decode_row("open_loans", row.try_get("lastname"))?;
            let borrowed_at: DateTime<Utc> = decode_row("open_loans", row.try_get("borrowed_at"))?;
            records.push(OpenLoanRecord {
                loan_id: LoanId::from_uuid(id),
                book_title,
                user_name: format!("{firstname} {lastname}"),
                borrowed_at,
            });
        }
        Ok(records)
    }

    async fn history_for_user(&self, user_id: UserId) -> DomainResult<Vec<LoanRecord>> {
        let known = sqlx::query("SELECT 1 AS one FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("history_fetch_user", e))?;
        if known.is_none() {
            return Err(DomainError::not_found("user"));
        }

        let rows = sqlx::query(
            r#"
            SELECT bb.id, bb.book_id, b.title AS book_title, bb.borrowed_at, bb.returned_at
            FROM borrowed_books bb
            JOIN books b ON b.id = bb.book_id
            WHERE bb.user_id = $1
            ORDER BY bb.borrowed_at ASC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("history_for_user", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let id: uuid::Uuid = decode_row("history_for_user", row.try_get("id"))?;
            let book_id: uuid::Uuid = decode_row("history_for_user", row.try_get("book_id"))?;
            let book_title: String = decode_row("history_for_user", row.try_get("book_title"))?;
            let borrowed_at: DateTime<Utc> =
                decode_row("history_for_user", row.try_get("borrowed_at"))?;
            let returned_at: Option<DateTime<Utc>> =
                decode_row("history_for_user", row.try_get("returned_at"))?;
            records.push(LoanRecord {
                loan_id: LoanId::from_uuid(id),
                book_id: BookId::from_uuid(book_id),
                book_title,
                borrowed_at,
                returned_at,
            });
        }
        Ok(records)
    }
}
