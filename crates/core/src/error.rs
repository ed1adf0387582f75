//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// invariants, conflicts). Infrastructure concerns are translated into
/// `Store` at the storage boundary and never leaked verbatim to callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed input, out-of-range field).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested entity was not found. The entity name is a stable,
    /// lowercase noun ("book", "user", "open loan").
    #[error("not found: {entity}")]
    NotFound { entity: &'static str },

    /// A uniqueness or referential conflict (duplicate isbn, author still
    /// referenced by books, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// No copies left to check out.
    #[error("no copies available")]
    OutOfStock,

    /// A transient concurrency conflict that survived the retry budget.
    /// Callers may retry the whole operation.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// A core invariant was observed violated (e.g. more than one open loan
    /// for a (user, book) pair). Always logged with context and surfaced as
    /// an internal failure, never silently resolved.
    #[error("integrity fault: {0}")]
    Integrity(String),

    /// Storage backend failure (connection, serialization of rows, ...).
    #[error("storage error: {0}")]
    Store(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn concurrency(msg: impl Into<String>) -> Self {
        Self::Concurrency(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        Self::Integrity(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// True for failures worth one more attempt at the service layer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Concurrency(_))
    }
}
