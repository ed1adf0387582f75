//! The inventory ledger: checkout and return as atomic, invariant-preserving
//! operations, plus its read-only query surface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use libris_core::{BookId, DomainError, DomainResult, LoanId, UserId};

use crate::loan::Loan;
use crate::query::{LoanRecord, OpenLoanRecord};

/// Successful checkout confirmation, referencing the book title and the
/// borrower by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub loan_id: LoanId,
    pub book_title: String,
    pub username: String,
    pub borrowed_at: DateTime<Utc>,
}

/// Successful return confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnReceipt {
    pub loan_id: LoanId,
    pub book_title: String,
    pub username: String,
    pub returned_at: DateTime<Utc>,
}

/// Transactional contract of the inventory ledger.
///
/// The ledger exclusively owns writes to `Book.stock` and to loans. Each
/// mutation runs inside a single storage transaction with isolation strong
/// enough to serialize concurrent mutations per book row: two checkouts
/// racing on the last copy must not both observe `stock == 1`.
/// Implementations either lock the book row for the transaction's duration
/// or condition the decrement on `stock > 0` at write time; under either
/// strategy stock never goes negative.
#[mockall::automock]
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Lend one copy of `book_id` to `user_id`: insert an open loan dated
    /// `now` and decrement stock, atomically.
    ///
    /// Fails `NotFound("book")`, then `OutOfStock`, then `NotFound("user")`,
    /// checked in that order. `Concurrency` reports a lost serialization
    /// race; callers may retry.
    async fn checkout(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<CheckoutReceipt>;

    /// Close the open loan for `(user_id, book_id)` at `now` and put the
    /// copy back, atomically.
    ///
    /// Fails `NotFound("open loan")` when no open loan exists, which also
    /// rejects returning a never-borrowed book and double-returning.
    async fn return_copy(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<ReturnReceipt>;

    /// Every open loan, joined with book title and borrower display name.
    /// An empty library is an empty list, not an error.
    async fn open_loans(&self) -> DomainResult<Vec<OpenLoanRecord>>;

    /// A user's full history ordered by `borrowed_at`. Fails
    /// `NotFound("user")` for an unknown user id; a known user with no
    /// loans gets an empty list.
    async fn history_for_user(&self, user_id: UserId) -> DomainResult<Vec<LoanRecord>>;
}

/// Pick the single open loan from the rows matching `(user, book)`.
///
/// Zero rows is the caller's "nothing to return". More than one means the
/// at-most-one-open-loan invariant is already broken: the earliest
/// `borrowed_at` would be the deterministic pick, but resolving silently
/// would hide corruption, so the fault is surfaced for the caller to log
/// and answer as an internal error.
pub fn resolve_open_loan(mut open: Vec<Loan>) -> DomainResult<Loan> {
    match open.len() {
        0 => Err(DomainError::not_found("open loan")),
        1 => Ok(open.swap_remove(0)),
        n => {
            open.sort_by_key(|loan| loan.borrowed_at);
            Err(DomainError::integrity(format!(
                "{n} open loans for user {} and book {} (earliest borrowed_at {})",
                open[0].user_id, open[0].book_id, open[0].borrowed_at
            )))
        }
    }
}
