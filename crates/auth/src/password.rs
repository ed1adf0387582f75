use bcrypt::{DEFAULT_COST, hash, verify};

use crate::error::AuthError;

/// A bcrypt password hash.
///
/// Debug output is redacted: the hash encodes the salt and work factor and
/// must never appear in logs or serialized responses.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Hash a plaintext password with a fresh random salt.
///
/// bcrypt is deliberately slow. Callers on a latency-sensitive path must run
/// this on a blocking worker, never inline on an async executor thread.
pub fn hash_password(plain: &str) -> Result<PasswordHash, AuthError> {
    hash(plain, DEFAULT_COST)
        .map(PasswordHash::new)
        .map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Check a presented password against a stored hash, collapsing every
/// failure mode (missing account, mismatch, unreadable hash) into the same
/// generic error so responses cannot be used to probe which accounts exist.
pub fn verify_credentials(stored: Option<&PasswordHash>, presented: &str) -> Result<(), AuthError> {
    let Some(stored) = stored else {
        return Err(AuthError::InvalidCredentials);
    };
    match verify(presented, stored.as_str()) {
        Ok(true) => Ok(()),
        Ok(false) | Err(_) => Err(AuthError::InvalidCredentials),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_accepts_the_password() {
        let hash = hash_password("correct horse").unwrap();
        assert!(verify_credentials(Some(&hash), "correct horse").is_ok());
    }

    #[test]
    fn wrong_password_and_unknown_account_are_indistinguishable() {
        let hash = hash_password("correct horse").unwrap();

        let wrong = verify_credentials(Some(&hash), "battery staple").unwrap_err();
        let missing = verify_credentials(None, "battery staple").unwrap_err();

        assert_eq!(wrong, AuthError::InvalidCredentials);
        assert_eq!(wrong, missing);
    }

    #[test]
    fn same_password_hashes_differently_per_call() {
        let a = hash_password("correct horse").unwrap();
        let b = hash_password("correct horse").unwrap();
        assert_ne!(a.as_str(), b.as_str());
    }

    #[test]
    fn debug_output_never_contains_the_hash() {
        let hash = hash_password("correct horse").unwrap();
        let rendered = format!("{hash:?}");
        assert!(!rendered.contains(hash.as_str()));
        assert!(rendered.contains("redacted"));
    }
}
