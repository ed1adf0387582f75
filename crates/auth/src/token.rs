use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};

use libris_core::UserId;

use crate::claims::{Claims, validate_claims};
use crate::error::AuthError;
use crate::roles::Role;

/// Issues and decodes signed, time-bounded access tokens (HS256).
///
/// The signing secret is process-wide state, loaded once at startup and never
/// rotated mid-process. Both `issue` and `decode` take the clock explicitly
/// so the time window is testable without sleeping.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked by `validate_claims` against the explicit clock,
        // keeping expired and forged tokens distinguishable. The library
        // still verifies signature, algorithm, and claim shape.
        validation.validate_exp = false;
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Produce a signed token for the user, valid from `now` for the
    /// configured TTL.
    pub fn issue(
        &self,
        user_id: UserId,
        username: &str,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: user_id,
            username: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AuthError::TokenEncoding(e.to_string()))
    }

    /// Verify signature and shape, then validate the claim window against
    /// `now`.
    ///
    /// `InvalidToken` covers malformed and forged tokens; `ExpiredToken` is
    /// reported only for a well-signed token past its expiry. Callers must
    /// treat both as "unauthenticated".
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        validate_claims(&data.claims, now)?;
        Ok(data.claims)
    }
}
