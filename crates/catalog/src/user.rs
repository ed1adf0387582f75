use async_trait::async_trait;

use libris_auth::{PasswordHash, Role};
use libris_core::{DomainResult, UserId};

use crate::validate::{require_email, require_present, require_text};

/// A registered user.
///
/// Carries the password hash for credential verification; the hash newtype
/// redacts itself from `Debug` output and response types never include it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password_hash: PasswordHash,
    pub role: Role,
}

impl User {
    /// Name shown in loan listings.
    pub fn display_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
    }
}

/// Registration request.
///
/// The plaintext password never enters this type; hashing happens before
/// construction, off the async path.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password_hash: PasswordHash,
    pub role: Role,
}

impl NewUser {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("username", &self.username)?;
        require_email(&self.email)?;
        require_present("firstname", &self.firstname)?;
        require_present("lastname", &self.lastname)?;
        Ok(())
    }
}

/// Storage contract for users.
///
/// Expected failures: `insert` reports `Conflict` naming the duplicated
/// field (username or email); `delete` reports `Conflict` while the user has
/// open loans.
#[mockall::automock]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn insert(&self, user: NewUser) -> DomainResult<User>;

    async fn list(&self) -> DomainResult<Vec<User>>;

    async fn fetch(&self, id: UserId) -> DomainResult<Option<User>>;

    /// Look up by username or email, whichever matches. Used by credential
    /// verification; a miss is collapsed into the generic failure there.
    async fn fetch_by_login(&self, username_or_email: &str) -> DomainResult<Option<User>>;

    async fn delete(&self, id: UserId) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_auth::hash_password;

    fn new_user() -> NewUser {
        NewUser {
            username: "maria".to_string(),
            email: "maria@example.com".to_string(),
            firstname: "Maria".to_string(),
            lastname: "Rivera".to_string(),
            password_hash: hash_password("correct horse").unwrap(),
            role: Role::member(),
        }
    }

    #[test]
    fn valid_registration_passes() {
        assert!(new_user().validate().is_ok());
    }

    #[test]
    fn email_must_look_like_an_email() {
        let mut user = new_user();
        user.email = "not-an-email".to_string();
        assert!(user.validate().is_err());

        user.email = String::new();
        assert!(user.validate().is_err());
    }

    #[test]
    fn names_cannot_be_blank() {
        let mut user = new_user();
        user.firstname = "   ".to_string();
        assert!(user.validate().is_err());
    }

    #[test]
    fn debug_output_redacts_the_hash() {
        let user = new_user();
        let rendered = format!("{user:?}");
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains(user.password_hash.as_str()));
    }
}
