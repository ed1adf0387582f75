//! Postgres storage backend.
//!
//! One pool-holding struct implements every storage contract. Catalog CRUD
//! lives in [`catalog`], the ledger transactions in [`ledger`]; both share
//! the row types and error translation defined here so the same pool (and
//! therefore the same transactional boundary) backs catalog writes and
//! ledger mutations.

pub mod catalog;
pub mod ledger;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Row};

use libris_auth::{PasswordHash, Role};
use libris_catalog::{Author, Book, User};
use libris_circulation::Loan;
use libris_core::{AuthorId, BookId, DomainError, DomainResult, LoanId, UserId};

use crate::error::map_sqlx_error;

/// Table definitions, applied idempotently at startup.
pub const SCHEMA: &str = include_str!("../schema.sql");

/// Postgres-backed library store.
///
/// Cloneable; the pool is shared. All ledger mutations run inside a single
/// transaction with a `FOR UPDATE` lock on the book row, serializing
/// concurrent checkouts and returns per book.
#[derive(Debug, Clone)]
pub struct PostgresLibrary {
    pool: Arc<PgPool>,
}

impl PostgresLibrary {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub async fn connect(database_url: &str) -> DomainResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the tables if they do not exist yet.
    pub async fn ensure_schema(&self) -> DomainResult<()> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("ensure_schema", e))?;
        Ok(())
    }

    pub(crate) fn pool(&self) -> &PgPool {
        &self.pool
    }
}

pub(crate) fn decode_row<T>(operation: &str, result: Result<T, sqlx::Error>) -> DomainResult<T> {
    result.map_err(|e| DomainError::store(format!("failed to decode row in {operation}: {e}")))
}

// Row types, mapped by hand (no sqlx macros).

#[derive(Debug)]
pub(crate) struct AuthorRow {
    pub id: uuid::Uuid,
    pub name: String,
}

impl<'r> FromRow<'r, PgRow> for AuthorRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(AuthorRow {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
        })
    }
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: AuthorId::from_uuid(row.id),
            name: row.name,
        }
    }
}

#[derive(Debug)]
pub(crate) struct BookRow {
    pub id: uuid::Uuid,
    pub title: String,
    pub isbn: String,
    pub publication_year: i32,
    pub genre: String,
    pub stock: i32,
    pub author_id: uuid::Uuid,
}

impl<'r> FromRow<'r, PgRow> for BookRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(BookRow {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            isbn: row.try_get("isbn")?,
            publication_year: row.try_get("publication_year")?,
            genre: row.try_get("genre")?,
            stock: row.try_get("stock")?,
            author_id: row.try_get("author_id")?,
        })
    }
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        Book {
            id: BookId::from_uuid(row.id),
            title: row.title,
            isbn: row.isbn,
            publication_year: row.publication_year,
            genre: row.genre,
            stock: row.stock,
            author_id: AuthorId::from_uuid(row.author_id),
        }
    }
}

#[derive(Debug)]
pub(crate) struct UserRow {
    pub id: uuid::Uuid,
    pub username: String,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub hashed_password: String,
    pub role: String,
}

impl<'r> FromRow<'r, PgRow> for UserRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(UserRow {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            firstname: row.try_get("firstname")?,
            lastname: row.try_get("lastname")?,
            hashed_password: row.try_get("hashed_password")?,
            role: row.try_get("role")?,
        })
    }
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: UserId::from_uuid(row.id),
            username: row.username,
            email: row.email,
            firstname: row.firstname,
            lastname: row.lastname,
            password_hash: PasswordHash::new(row.hashed_password),
            role: Role::new(row.role),
        }
    }
}

#[derive(Debug)]
pub(crate) struct LoanRow {
    pub id: uuid::Uuid,
    pub user_id: uuid::Uuid,
    pub book_id: uuid::Uuid,
    pub borrowed_at: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
}

impl<'r> FromRow<'r, PgRow> for LoanRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(LoanRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            book_id: row.try_get("book_id")?,
            borrowed_at: row.try_get("borrowed_at")?,
            returned_at: row.try_get("returned_at")?,
        })
    }
}

impl From<LoanRow> for Loan {
    fn from(row: LoanRow) -> Self {
        Loan {
            id: LoanId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            book_id: BookId::from_uuid(row.book_id),
            borrowed_at: row.borrowed_at,
            returned_at: row.returned_at,
        }
    }
}
