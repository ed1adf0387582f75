//! `libris-circulation` — the borrow/return lifecycle domain.
//!
//! Loans, checkout/return receipts, the transactional ledger contract, and
//! the open-loan resolution rules. Implementations of [`LedgerRepository`]
//! live in `libris-infra`; everything here is storage-agnostic.

pub mod ledger;
pub mod loan;
pub mod query;

pub use ledger::{
    CheckoutReceipt, LedgerRepository, MockLedgerRepository, ReturnReceipt, resolve_open_loan,
};
pub use loan::Loan;
pub use query::{LoanRecord, OpenLoanRecord};
