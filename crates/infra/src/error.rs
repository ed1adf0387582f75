//! Translation of storage errors into domain errors.
//!
//! SQLSTATE mapping:
//!
//! | Code | Meaning | `DomainError` |
//! |------|---------|---------------|
//! | `23505` | unique violation (isbn, username, email) | `Conflict` |
//! | `23503` | foreign key violation (dangling reference, referenced row) | `Conflict` |
//! | `23514` | check violation (`stock >= 0` slipped past the lock) | `Integrity` |
//! | `40001` | serialization failure | `Concurrency` |
//! | `40P01` | deadlock detected | `Concurrency` |
//!
//! Everything else becomes `Store`; the handler boundary answers those with
//! a generic 5xx and never leaks the message to clients.

use libris_core::DomainError;

pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => DomainError::conflict(msg),
                Some("23514") => DomainError::integrity(msg),
                Some("40001") | Some("40P01") => DomainError::concurrency(msg),
                _ => DomainError::store(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            DomainError::store(format!("connection pool closed in {operation}"))
        }
        sqlx::Error::RowNotFound => {
            // Queries here use fetch_optional/fetch_all, so this is unexpected.
            DomainError::store(format!("unexpected row not found in {operation}"))
        }
        other => DomainError::store(format!("sqlx error in {operation}: {other}")),
    }
}
