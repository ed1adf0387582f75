use chrono::{DateTime, Utc};

use libris_core::{BookId, LoanId};

/// One row of the open-loans listing: a loan joined with the book title and
/// the borrower's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenLoanRecord {
    pub loan_id: LoanId,
    pub book_title: String,
    pub user_name: String,
    pub borrowed_at: DateTime<Utc>,
}

/// One row of a user's borrow history, open and closed, ordered by
/// `borrowed_at`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRecord {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub book_title: String,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}
