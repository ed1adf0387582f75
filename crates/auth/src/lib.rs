//! `libris-auth` — pure authentication primitives (claims, tokens, hashing).
//!
//! This crate is intentionally decoupled from HTTP and storage. Credential
//! lookup lives with the stores; everything here is deterministic given a
//! clock, which keeps the token window and the enumeration-resistance rules
//! unit-testable.

pub mod claims;
pub mod error;
pub mod password;
pub mod roles;
pub mod token;

pub use claims::{Claims, TokenValidationError, validate_claims};
pub use error::AuthError;
pub use password::{PasswordHash, hash_password, verify_credentials};
pub use roles::Role;
pub use token::TokenService;
