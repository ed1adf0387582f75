use thiserror::Error;

use crate::claims::TokenValidationError;

/// Authentication failure.
///
/// `InvalidCredentials` is deliberately generic: it covers both "unknown
/// user" and "wrong password" so responses cannot be used to enumerate
/// accounts.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid token")]
    InvalidToken,

    #[error("token has expired")]
    ExpiredToken,

    #[error("failed to sign token: {0}")]
    TokenEncoding(String),

    #[error("failed to hash password: {0}")]
    Hashing(String),
}

impl From<TokenValidationError> for AuthError {
    fn from(err: TokenValidationError) -> Self {
        match err {
            TokenValidationError::Expired => AuthError::ExpiredToken,
            TokenValidationError::NotYetValid | TokenValidationError::InvalidTimeWindow => {
                AuthError::InvalidToken
            }
        }
    }
}
