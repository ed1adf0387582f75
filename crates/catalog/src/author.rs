use async_trait::async_trait;

use libris_core::{AuthorId, DomainResult};

use crate::book::Book;
use crate::validate::require_text;

/// An author in the catalog. Owns zero or more books.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
}

/// An author joined with all of their books.
///
/// Produced only by [`AuthorRepository::fetch_with_books`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorWithBooks {
    pub author: Author,
    pub books: Vec<Book>,
}

/// Request to add an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAuthor {
    pub name: String,
}

impl NewAuthor {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("name", &self.name)
    }
}

/// Storage contract for authors.
///
/// Deletion is restricted: `delete` reports `Conflict` while any book still
/// references the author.
#[mockall::automock]
#[async_trait]
pub trait AuthorRepository: Send + Sync {
    async fn insert(&self, author: NewAuthor) -> DomainResult<Author>;

    async fn list(&self) -> DomainResult<Vec<Author>>;

    /// Author row only, no join.
    async fn fetch(&self, id: AuthorId) -> DomainResult<Option<Author>>;

    /// Author row plus every book they wrote.
    async fn fetch_with_books(&self, id: AuthorId) -> DomainResult<Option<AuthorWithBooks>>;

    async fn delete(&self, id: AuthorId) -> DomainResult<()>;
}
