use async_trait::async_trait;

use libris_core::{AuthorId, BookId, DomainResult};

use crate::validate::{require_non_negative_stock, require_publication_year, require_text};

/// A book title in the catalog.
///
/// `stock` counts copies currently available for checkout. It is written
/// exclusively by the circulation ledger; catalog edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub stock: i32,
    pub author_id: AuthorId,
}

/// A book joined with its author's name.
///
/// Produced only by [`BookRepository::fetch_with_author`]; the plain `fetch`
/// never pays for the join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookWithAuthor {
    pub book: Book,
    pub author_name: String,
}

/// Request to add a book to the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub stock: i32,
    pub author_id: AuthorId,
}

impl NewBook {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("title", &self.title)?;
        require_text("isbn", &self.isbn)?;
        require_text("genre", &self.genre)?;
        require_publication_year(self.publication_year)?;
        require_non_negative_stock(self.stock)?;
        Ok(())
    }
}

/// Catalog edit of an existing book.
///
/// Deliberately carries no `stock` field: stock is owned by the ledger, and
/// an edit racing a checkout must not be able to overwrite the count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookPatch {
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub author_id: AuthorId,
}

impl BookPatch {
    pub fn validate(&self) -> DomainResult<()> {
        require_text("title", &self.title)?;
        require_text("isbn", &self.isbn)?;
        require_text("genre", &self.genre)?;
        require_publication_year(self.publication_year)?;
        Ok(())
    }
}

/// Storage contract for books.
///
/// Expected failures: `insert`/`update` report `Conflict` for a duplicate
/// isbn and `NotFound("author")` for a dangling author reference; `delete`
/// reports `Conflict` while loan history references the book (loans are
/// never deleted).
#[mockall::automock]
#[async_trait]
pub trait BookRepository: Send + Sync {
    async fn insert(&self, book: NewBook) -> DomainResult<Book>;

    async fn list(&self) -> DomainResult<Vec<Book>>;

    /// Book row only, no join.
    async fn fetch(&self, id: BookId) -> DomainResult<Option<Book>>;

    /// Book row plus the author name (one join, visible at the call site).
    async fn fetch_with_author(&self, id: BookId) -> DomainResult<Option<BookWithAuthor>>;

    async fn update(&self, id: BookId, patch: BookPatch) -> DomainResult<Book>;

    async fn delete(&self, id: BookId) -> DomainResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use libris_core::DomainError;

    fn new_book() -> NewBook {
        NewBook {
            title: "The Dispossessed".to_string(),
            isbn: "978-0060512750".to_string(),
            publication_year: 1974,
            genre: "Science Fiction".to_string(),
            stock: 3,
            author_id: AuthorId::new(),
        }
    }

    #[test]
    fn valid_book_passes() {
        assert!(new_book().validate().is_ok());
    }

    #[test]
    fn short_title_is_rejected() {
        let mut book = new_book();
        book.title = "ab".to_string();
        assert!(matches!(book.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn overlong_genre_is_rejected() {
        let mut book = new_book();
        book.genre = "g".repeat(crate::validate::TEXT_MAX_CHARS + 1);
        assert!(matches!(book.validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn year_bounds_are_exclusive() {
        let mut book = new_book();

        book.publication_year = 1900;
        assert!(book.validate().is_err());
        book.publication_year = 1901;
        assert!(book.validate().is_ok());

        book.publication_year = 2025;
        assert!(book.validate().is_err());
        book.publication_year = 2024;
        assert!(book.validate().is_ok());
    }

    #[test]
    fn negative_stock_is_rejected() {
        let mut book = new_book();
        book.stock = -1;
        assert!(matches!(book.validate(), Err(DomainError::Validation(_))));

        book.stock = 0;
        assert!(book.validate().is_ok());
    }

    #[test]
    fn patch_validates_same_text_bounds() {
        let patch = BookPatch {
            title: "ok".to_string(),
            isbn: "978-0060512750".to_string(),
            publication_year: 1974,
            genre: "Science Fiction".to_string(),
            author_id: AuthorId::new(),
        };
        assert!(patch.validate().is_err());
    }
}
