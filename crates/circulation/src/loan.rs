use chrono::{DateTime, Utc};

use libris_core::{BookId, LoanId, UserId};

/// One borrow of one physical copy by one user.
///
/// `returned_at = None` marks the loan open. A `(user, book)` pair may
/// accumulate many historical loans but holds at most one open loan at a
/// time. The checkout/return protocol enforces that, not a uniqueness
/// constraint, because the same user may borrow and return the same title
/// repeatedly.
///
/// Loans are never deleted; closed loans are the audit history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Loan {
    pub id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.returned_at.is_none()
    }
}
