//! Request and response bodies.
//!
//! Every endpoint answers with an explicit struct; domain types never
//! serialize directly, so wire shapes can only change here. User responses
//! deliberately have no field for the password hash.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use libris_catalog::{Author, AuthorWithBooks, Book, BookWithAuthor, User};
use libris_circulation::{LoanRecord, OpenLoanRecord};
use libris_core::{AuthorId, BookId, LoanId, UserId};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    /// Username or email; either identifies the account.
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
}

#[derive(Debug, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub stock: i32,
    pub author_id: AuthorId,
}

/// Carries no `stock`: the ledger owns that count.
#[derive(Debug, Deserialize)]
pub struct UpdateBookRequest {
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub author_id: AuthorId,
}

#[derive(Debug, Serialize)]
pub struct BookResponse {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub stock: i32,
    pub author_id: AuthorId,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            publication_year: book.publication_year,
            genre: book.genre,
            stock: book.stock,
            author_id: book.author_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BookDetailResponse {
    pub id: BookId,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub stock: i32,
    pub author_id: AuthorId,
    pub author_name: String,
}

impl From<BookWithAuthor> for BookDetailResponse {
    fn from(detail: BookWithAuthor) -> Self {
        let book = detail.book;
        Self {
            id: book.id,
            title: book.title,
            isbn: book.isbn,
            publication_year: book.publication_year,
            genre: book.genre,
            stock: book.stock,
            author_id: book.author_id,
            author_name: detail.author_name,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateAuthorRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AuthorResponse {
    pub id: AuthorId,
    pub name: String,
}

impl From<Author> for AuthorResponse {
    fn from(author: Author) -> Self {
        Self {
            id: author.id,
            name: author.name,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthorDetailResponse {
    pub id: AuthorId,
    pub name: String,
    pub books: Vec<BookResponse>,
}

impl From<AuthorWithBooks> for AuthorDetailResponse {
    fn from(detail: AuthorWithBooks) -> Self {
        Self {
            id: detail.author.id,
            name: detail.author.name,
            books: detail.books.into_iter().map(BookResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub role: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            role: user.role.as_str().to_string(),
        }
    }
}

/// Confirmation of a checkout or return.
#[derive(Debug, Serialize)]
pub struct BorrowConfirmation {
    pub loan_id: LoanId,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct OpenLoanResponse {
    pub loan_id: LoanId,
    pub book_title: String,
    pub user_name: String,
    pub borrowed_at: DateTime<Utc>,
}

impl From<OpenLoanRecord> for OpenLoanResponse {
    fn from(record: OpenLoanRecord) -> Self {
        Self {
            loan_id: record.loan_id,
            book_title: record.book_title,
            user_name: record.user_name,
            borrowed_at: record.borrowed_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryEntryResponse {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub book_title: String,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl From<LoanRecord> for HistoryEntryResponse {
    fn from(record: LoanRecord) -> Self {
        Self {
            loan_id: record.loan_id,
            book_id: record.book_id,
            book_title: record.book_title,
            borrowed_at: record.borrowed_at,
            returned_at: record.returned_at,
        }
    }
}
