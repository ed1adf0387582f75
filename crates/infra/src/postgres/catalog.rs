//! Catalog CRUD and seeding storage against Postgres.
//!
//! Uniqueness conflicts are pre-checked for friendly errors; the unique
//! constraints remain the backstop and still surface as `Conflict` through
//! the error mapping if a race slips past a pre-check.

use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use libris_catalog::{
    Author, AuthorRepository, AuthorWithBooks, Book, BookPatch, BookRepository, BookWithAuthor,
    NewAuthor, NewBook, NewUser, User, UserRepository,
};
use libris_core::{AuthorId, BookId, DomainError, DomainResult, UserId};

use crate::error::map_sqlx_error;
use crate::seeding::{PurgeReport, SeedStore};

use super::{AuthorRow, BookRow, PostgresLibrary, UserRow, decode_row};

impl PostgresLibrary {
    async fn author_exists(&self, id: AuthorId) -> DomainResult<bool> {
        let row = sqlx::query("SELECT 1 AS one FROM authors WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("author_exists", e))?;
        Ok(row.is_some())
    }

    async fn isbn_taken(&self, isbn: &str, exclude: Option<BookId>) -> DomainResult<bool> {
        let row = sqlx::query(
            "SELECT 1 AS one FROM books WHERE isbn = $1 AND ($2::uuid IS NULL OR id <> $2)",
        )
        .bind(isbn)
        .bind(exclude.map(|id| *id.as_uuid()))
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("isbn_taken", e))?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl BookRepository for PostgresLibrary {
    #[instrument(skip(self, book), err)]
    async fn insert(&self, book: NewBook) -> DomainResult<Book> {
        if !self.author_exists(book.author_id).await? {
            return Err(DomainError::not_found("author"));
        }
        if self.isbn_taken(&book.isbn, None).await? {
            return Err(DomainError::conflict("isbn already exists"));
        }

        let id = BookId::new();
        sqlx::query(
            r#"
            INSERT INTO books (id, title, isbn, publication_year, genre, stock, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(book.stock)
        .bind(book.author_id.as_uuid())
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("insert_book", e))?;

        Ok(Book {
            id,
            title: book.title,
            isbn: book.isbn,
            publication_year: book.publication_year,
            genre: book.genre,
            stock: book.stock,
            author_id: book.author_id,
        })
    }

    async fn list(&self) -> DomainResult<Vec<Book>> {
        let rows = sqlx::query(
            "SELECT id, title, isbn, publication_year, genre, stock, author_id \
             FROM books ORDER BY title ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("list_books", e))?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(decode_row("list_books", BookRow::from_row(&row))?.into());
        }
        Ok(books)
    }

    async fn fetch(&self, id: BookId) -> DomainResult<Option<Book>> {
        let row = sqlx::query(
            "SELECT id, title, isbn, publication_year, genre, stock, author_id \
             FROM books WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("fetch_book", e))?;

        match row {
            Some(row) => Ok(Some(decode_row("fetch_book", BookRow::from_row(&row))?.into())),
            None => Ok(None),
        }
    }

    async fn fetch_with_author(&self, id: BookId) -> DomainResult<Option<BookWithAuthor>> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.title, b.isbn, b.publication_year, b.genre, b.stock, b.author_id,
                   a.name AS author_name
            FROM books b
            JOIN authors a ON a.id = b.author_id
            WHERE b.id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("fetch_book_with_author", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let book: Book = decode_row("fetch_book_with_author", BookRow::from_row(&row))?.into();
        let author_name: String = decode_row(
            "fetch_book_with_author",
            sqlx::Row::try_get(&row, "author_name"),
        )?;
        Ok(Some(BookWithAuthor { book, author_name }))
    }

    #[instrument(skip(self, patch), fields(book_id = %id), err)]
    async fn update(&self, id: BookId, patch: BookPatch) -> DomainResult<Book> {
        if !self.author_exists(patch.author_id).await? {
            return Err(DomainError::not_found("author"));
        }
        if self.isbn_taken(&patch.isbn, Some(id)).await? {
            return Err(DomainError::conflict("isbn already exists"));
        }

        // Stock is deliberately absent from the SET list: it belongs to the
        // ledger and a catalog edit must not race a checkout over it.
        let row = sqlx::query(
            r#"
            UPDATE books
            SET title = $2, isbn = $3, publication_year = $4, genre = $5, author_id = $6
            WHERE id = $1
            RETURNING id, title, isbn, publication_year, genre, stock, author_id
            "#,
        )
        .bind(id.as_uuid())
        .bind(&patch.title)
        .bind(&patch.isbn)
        .bind(patch.publication_year)
        .bind(&patch.genre)
        .bind(patch.author_id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("update_book", e))?;

        let Some(row) = row else {
            return Err(DomainError::not_found("book"));
        };
        Ok(decode_row("update_book", BookRow::from_row(&row))?.into())
    }

    #[instrument(skip(self), fields(book_id = %id), err)]
    async fn delete(&self, id: BookId) -> DomainResult<()> {
        let referenced = sqlx::query("SELECT 1 AS one FROM borrowed_books WHERE book_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_book", e))?;
        if referenced.is_some() {
            return Err(DomainError::conflict("book has loan history"));
        }

        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_book", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("book"));
        }
        Ok(())
    }
}

#[async_trait]
impl AuthorRepository for PostgresLibrary {
    #[instrument(skip(self, author), err)]
    async fn insert(&self, author: NewAuthor) -> DomainResult<Author> {
        let id = AuthorId::new();
        sqlx::query("INSERT INTO authors (id, name) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(&author.name)
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("insert_author", e))?;
        Ok(Author {
            id,
            name: author.name,
        })
    }

    async fn list(&self) -> DomainResult<Vec<Author>> {
        let rows = sqlx::query("SELECT id, name FROM authors ORDER BY name ASC")
            .fetch_all(self.pool())
            .await
            .map_err(|e| map_sqlx_error("list_authors", e))?;

        let mut authors = Vec::with_capacity(rows.len());
        for row in rows {
            authors.push(decode_row("list_authors", AuthorRow::from_row(&row))?.into());
        }
        Ok(authors)
    }

    async fn fetch(&self, id: AuthorId) -> DomainResult<Option<Author>> {
        let row = sqlx::query("SELECT id, name FROM authors WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("fetch_author", e))?;
        match row {
            Some(row) => Ok(Some(decode_row("fetch_author", AuthorRow::from_row(&row))?.into())),
            None => Ok(None),
        }
    }

    async fn fetch_with_books(&self, id: AuthorId) -> DomainResult<Option<AuthorWithBooks>> {
        let Some(author) = AuthorRepository::fetch(self, id).await? else {
            return Ok(None);
        };

        let rows = sqlx::query(
            "SELECT id, title, isbn, publication_year, genre, stock, author_id \
             FROM books WHERE author_id = $1 ORDER BY title ASC",
        )
        .bind(id.as_uuid())
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("fetch_author_books", e))?;

        let mut books = Vec::with_capacity(rows.len());
        for row in rows {
            books.push(decode_row("fetch_author_books", BookRow::from_row(&row))?.into());
        }
        Ok(Some(AuthorWithBooks { author, books }))
    }

    #[instrument(skip(self), fields(author_id = %id), err)]
    async fn delete(&self, id: AuthorId) -> DomainResult<()> {
        let referenced = sqlx::query("SELECT 1 AS one FROM books WHERE author_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_author", e))?;
        if referenced.is_some() {
            return Err(DomainError::conflict("author has books"));
        }

        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_author", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("author"));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepository for PostgresLibrary {
    #[instrument(skip(self, user), err)]
    async fn insert(&self, user: NewUser) -> DomainResult<User> {
        let taken = sqlx::query("SELECT username, email FROM users WHERE username = $1 OR email = $2")
            .bind(&user.username)
            .bind(&user.email)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;
        if let Some(row) = taken {
            let existing: String = decode_row("insert_user", sqlx::Row::try_get(&row, "username"))?;
            if existing == user.username {
                return Err(DomainError::conflict("username already exists"));
            }
            return Err(DomainError::conflict("email already exists"));
        }

        let id = UserId::new();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, firstname, lastname, hashed_password, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(user.password_hash.as_str())
        .bind(user.role.as_str())
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;

        Ok(User {
            id,
            username: user.username,
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            password_hash: user.password_hash,
            role: user.role,
        })
    }

    async fn list(&self) -> DomainResult<Vec<User>> {
        let rows = sqlx::query(
            "SELECT id, username, email, firstname, lastname, hashed_password, role \
             FROM users ORDER BY username ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(|e| map_sqlx_error("list_users", e))?;

        let mut users = Vec::with_capacity(rows.len());
        for row in rows {
            users.push(decode_row("list_users", UserRow::from_row(&row))?.into());
        }
        Ok(users)
    }

    async fn fetch(&self, id: UserId) -> DomainResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, firstname, lastname, hashed_password, role \
             FROM users WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("fetch_user", e))?;
        match row {
            Some(row) => Ok(Some(decode_row("fetch_user", UserRow::from_row(&row))?.into())),
            None => Ok(None),
        }
    }

    async fn fetch_by_login(&self, username_or_email: &str) -> DomainResult<Option<User>> {
        let row = sqlx::query(
            "SELECT id, username, email, firstname, lastname, hashed_password, role \
             FROM users WHERE username = $1 OR email = $1",
        )
        .bind(username_or_email)
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("fetch_user_by_login", e))?;
        match row {
            Some(row) => Ok(Some(
                decode_row("fetch_user_by_login", UserRow::from_row(&row))?.into(),
            )),
            None => Ok(None),
        }
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete(&self, id: UserId) -> DomainResult<()> {
        let open = sqlx::query(
            "SELECT 1 AS one FROM borrowed_books \
             WHERE user_id = $1 AND returned_at IS NULL LIMIT 1",
        )
        .bind(id.as_uuid())
        .fetch_optional(self.pool())
        .await
        .map_err(|e| map_sqlx_error("delete_user", e))?;
        if open.is_some() {
            return Err(DomainError::conflict("user has open loans"));
        }

        let history = sqlx::query("SELECT 1 AS one FROM borrowed_books WHERE user_id = $1 LIMIT 1")
            .bind(id.as_uuid())
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if history.is_some() {
            return Err(DomainError::conflict("user has loan history"));
        }

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_uuid())
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user"));
        }
        Ok(())
    }
}

#[async_trait]
impl SeedStore for PostgresLibrary {
    async fn upsert_author(&self, name: &str) -> DomainResult<AuthorId> {
        let existing = sqlx::query("SELECT id FROM authors WHERE name = $1 LIMIT 1")
            .bind(name)
            .fetch_optional(self.pool())
            .await
            .map_err(|e| map_sqlx_error("upsert_author", e))?;
        if let Some(row) = existing {
            let id: uuid::Uuid = decode_row("upsert_author", sqlx::Row::try_get(&row, "id"))?;
            return Ok(AuthorId::from_uuid(id));
        }

        let id = AuthorId::new();
        sqlx::query("INSERT INTO authors (id, name) VALUES ($1, $2)")
            .bind(id.as_uuid())
            .bind(name)
            .execute(self.pool())
            .await
            .map_err(|e| map_sqlx_error("upsert_author", e))?;
        Ok(id)
    }

    async fn insert_book_if_new(&self, book: NewBook) -> DomainResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO books (id, title, isbn, publication_year, genre, stock, author_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (isbn) DO NOTHING
            "#,
        )
        .bind(BookId::new().as_uuid())
        .bind(&book.title)
        .bind(&book.isbn)
        .bind(book.publication_year)
        .bind(&book.genre)
        .bind(book.stock)
        .bind(book.author_id.as_uuid())
        .execute(self.pool())
        .await
        .map_err(|e| map_sqlx_error("insert_book_if_new", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), err)]
    async fn purge_unreferenced(&self) -> DomainResult<PurgeReport> {
        let mut tx = self
            .pool()
            .begin()
            .await
            .map_err(|e| map_sqlx_error("purge_begin", e))?;

        let books = sqlx::query(
            "DELETE FROM books \
             WHERE id NOT IN (SELECT DISTINCT book_id FROM borrowed_books)",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("purge_books", e))?;

        let authors = sqlx::query(
            "DELETE FROM authors \
             WHERE id NOT IN (SELECT DISTINCT author_id FROM books)",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("purge_authors", e))?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("purge_commit", e))?;

        Ok(PurgeReport {
            books_deleted: books.rows_affected(),
            authors_deleted: authors.rows_affected(),
        })
    }
}
