//! Field validation shared by the catalog request types.
//!
//! Constraints are explicit precondition checks at the boundary, not schema
//! magic: handlers call `validate()` on a request type before any storage
//! call.

use libris_core::{DomainError, DomainResult};

/// Inclusive length bounds for short text fields (titles, names, isbn, genre).
pub const TEXT_MIN_CHARS: usize = 3;
pub const TEXT_MAX_CHARS: usize = 100;

/// Publication year bounds, both exclusive: `1900 < year < 2025`.
pub const YEAR_MIN_EXCLUSIVE: i32 = 1900;
pub const YEAR_MAX_EXCLUSIVE: i32 = 2025;

pub(crate) fn require_text(field: &'static str, value: &str) -> DomainResult<()> {
    let len = value.chars().count();
    if len < TEXT_MIN_CHARS || len > TEXT_MAX_CHARS {
        return Err(DomainError::validation(format!(
            "{field} must be between {TEXT_MIN_CHARS} and {TEXT_MAX_CHARS} characters"
        )));
    }
    Ok(())
}

pub(crate) fn require_present(field: &'static str, value: &str) -> DomainResult<()> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

pub(crate) fn require_email(value: &str) -> DomainResult<()> {
    if value.trim().is_empty() || !value.contains('@') {
        return Err(DomainError::validation("invalid email format"));
    }
    Ok(())
}

pub(crate) fn require_publication_year(year: i32) -> DomainResult<()> {
    if year <= YEAR_MIN_EXCLUSIVE || year >= YEAR_MAX_EXCLUSIVE {
        return Err(DomainError::validation(format!(
            "publication_year must be after {YEAR_MIN_EXCLUSIVE} and before {YEAR_MAX_EXCLUSIVE}"
        )));
    }
    Ok(())
}

pub(crate) fn require_non_negative_stock(stock: i32) -> DomainResult<()> {
    if stock < 0 {
        return Err(DomainError::validation("stock cannot be negative"));
    }
    Ok(())
}
