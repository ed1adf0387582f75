//! Service wrapper over the ledger contract.
//!
//! Adds the retry budget for transient concurrency conflicts and the
//! logging policy for integrity faults. Handlers talk to this, never to a
//! [`LedgerRepository`] directly.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use libris_circulation::{CheckoutReceipt, LedgerRepository, LoanRecord, OpenLoanRecord, ReturnReceipt};
use libris_core::{BookId, DomainError, DomainResult, UserId};

/// Attempts per mutation before a `Concurrency` failure is surfaced to the
/// caller as retryable.
const MAX_ATTEMPTS: u32 = 3;

pub struct LedgerService {
    ledger: Arc<dyn LedgerRepository>,
}

impl LedgerService {
    pub fn new(ledger: Arc<dyn LedgerRepository>) -> Self {
        Self { ledger }
    }

    #[instrument(skip(self), fields(user_id = %user_id, book_id = %book_id), err)]
    pub async fn checkout(&self, user_id: UserId, book_id: BookId) -> DomainResult<CheckoutReceipt> {
        let mut attempt = 1;
        loop {
            match self.ledger.checkout(user_id, book_id, Utc::now()).await {
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(attempt, error = %err, "checkout lost a serialization race; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(self.observe(err)),
                Ok(receipt) => return Ok(receipt),
            }
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id, book_id = %book_id), err)]
    pub async fn return_copy(&self, user_id: UserId, book_id: BookId) -> DomainResult<ReturnReceipt> {
        let mut attempt = 1;
        loop {
            match self.ledger.return_copy(user_id, book_id, Utc::now()).await {
                Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                    tracing::warn!(attempt, error = %err, "return lost a serialization race; retrying");
                    attempt += 1;
                }
                Err(err) => return Err(self.observe(err)),
                Ok(receipt) => return Ok(receipt),
            }
        }
    }

    pub async fn open_loans(&self) -> DomainResult<Vec<OpenLoanRecord>> {
        self.ledger.open_loans().await
    }

    pub async fn history_for_user(&self, user_id: UserId) -> DomainResult<Vec<LoanRecord>> {
        self.ledger.history_for_user(user_id).await
    }

    /// Integrity faults mean an invariant was already broken before this
    /// call; they are logged with full context here, once, and surfaced as
    /// an internal failure.
    fn observe(&self, err: DomainError) -> DomainError {
        if let DomainError::Integrity(detail) = &err {
            tracing::error!(detail, "ledger invariant violated");
        }
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use libris_circulation::MockLedgerRepository;
    use libris_core::LoanId;

    fn receipt(now: DateTime<Utc>) -> CheckoutReceipt {
        CheckoutReceipt {
            loan_id: LoanId::new(),
            book_title: "The Dispossessed".to_string(),
            username: "maria".to_string(),
            borrowed_at: now,
        }
    }

    #[tokio::test]
    async fn transient_conflicts_are_retried_up_to_the_budget() {
        let mut ledger = MockLedgerRepository::new();
        let mut calls = 0;
        ledger.expect_checkout().times(3).returning(move |_, _, now| {
            calls += 1;
            if calls < 3 {
                Err(DomainError::concurrency("serialization failure"))
            } else {
                Ok(receipt(now))
            }
        });

        let service = LedgerService::new(Arc::new(ledger));
        let result = service.checkout(UserId::new(), BookId::new()).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn conflict_surfaces_after_the_budget_is_exhausted() {
        let mut ledger = MockLedgerRepository::new();
        ledger
            .expect_checkout()
            .times(3)
            .returning(|_, _, _| Err(DomainError::concurrency("serialization failure")));

        let service = LedgerService::new(Arc::new(ledger));
        let err = service.checkout(UserId::new(), BookId::new()).await.unwrap_err();
        assert!(matches!(err, DomainError::Concurrency(_)));
    }

    #[tokio::test]
    async fn domain_failures_are_never_retried() {
        let mut ledger = MockLedgerRepository::new();
        ledger
            .expect_checkout()
            .times(1)
            .returning(|_, _, _| Err(DomainError::OutOfStock));

        let service = LedgerService::new(Arc::new(ledger));
        let err = service.checkout(UserId::new(), BookId::new()).await.unwrap_err();
        assert_eq!(err, DomainError::OutOfStock);
    }

    #[tokio::test]
    async fn integrity_faults_are_surfaced_not_retried() {
        let mut ledger = MockLedgerRepository::new();
        ledger
            .expect_return_copy()
            .times(1)
            .returning(|_, _, _| Err(DomainError::integrity("2 open loans")));

        let service = LedgerService::new(Arc::new(ledger));
        let err = service
            .return_copy(UserId::new(), BookId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Integrity(_)));
    }
}
