//! In-memory storage backend.
//!
//! Serves tests and dev mode. One `RwLock` guards the whole library state;
//! every ledger mutation runs under a single write guard, which is the
//! in-process equivalent of the Postgres per-book row lock: no interleaving
//! between the stock read and the stock write.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use libris_catalog::{
    Author, AuthorRepository, AuthorWithBooks, Book, BookPatch, BookRepository, BookWithAuthor,
    NewAuthor, NewBook, NewUser, User, UserRepository,
};
use libris_circulation::{
    CheckoutReceipt, LedgerRepository, Loan, LoanRecord, OpenLoanRecord, ReturnReceipt,
    resolve_open_loan,
};
use libris_core::{AuthorId, BookId, DomainError, DomainResult, LoanId, UserId};

use crate::seeding::{PurgeReport, SeedStore};

#[derive(Debug, Default)]
struct LibraryState {
    authors: HashMap<AuthorId, Author>,
    books: HashMap<BookId, Book>,
    users: HashMap<UserId, User>,
    loans: Vec<Loan>,
}

/// Whole-library store behind one lock. Implements every storage contract
/// the service wires up, so dev mode and tests swap in for Postgres 1:1.
#[derive(Debug, Default)]
pub struct InMemoryLibrary {
    state: RwLock<LibraryState>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

fn read_state(
    state: &RwLock<LibraryState>,
) -> DomainResult<std::sync::RwLockReadGuard<'_, LibraryState>> {
    state
        .read()
        .map_err(|_| DomainError::store("lock poisoned"))
}

fn write_state(
    state: &RwLock<LibraryState>,
) -> DomainResult<std::sync::RwLockWriteGuard<'_, LibraryState>> {
    state
        .write()
        .map_err(|_| DomainError::store("lock poisoned"))
}

#[async_trait]
impl BookRepository for InMemoryLibrary {
    async fn insert(&self, book: NewBook) -> DomainResult<Book> {
        let mut state = write_state(&self.state)?;
        if !state.authors.contains_key(&book.author_id) {
            return Err(DomainError::not_found("author"));
        }
        if state.books.values().any(|b| b.isbn == book.isbn) {
            return Err(DomainError::conflict("isbn already exists"));
        }
        let stored = Book {
            id: BookId::new(),
            title: book.title,
            isbn: book.isbn,
            publication_year: book.publication_year,
            genre: book.genre,
            stock: book.stock,
            author_id: book.author_id,
        };
        state.books.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> DomainResult<Vec<Book>> {
        let state = read_state(&self.state)?;
        let mut books: Vec<Book> = state.books.values().cloned().collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn fetch(&self, id: BookId) -> DomainResult<Option<Book>> {
        Ok(read_state(&self.state)?.books.get(&id).cloned())
    }

    async fn fetch_with_author(&self, id: BookId) -> DomainResult<Option<BookWithAuthor>> {
        let state = read_state(&self.state)?;
        let Some(book) = state.books.get(&id) else {
            return Ok(None);
        };
        let author = state.authors.get(&book.author_id).ok_or_else(|| {
            DomainError::integrity(format!("book {} references missing author", book.id))
        })?;
        Ok(Some(BookWithAuthor {
            book: book.clone(),
            author_name: author.name.clone(),
        }))
    }

    async fn update(&self, id: BookId, patch: BookPatch) -> DomainResult<Book> {
        let mut state = write_state(&self.state)?;
        if !state.authors.contains_key(&patch.author_id) {
            return Err(DomainError::not_found("author"));
        }
        if state
            .books
            .values()
            .any(|b| b.id != id && b.isbn == patch.isbn)
        {
            return Err(DomainError::conflict("isbn already exists"));
        }
        let book = state
            .books
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("book"))?;
        book.title = patch.title;
        book.isbn = patch.isbn;
        book.publication_year = patch.publication_year;
        book.genre = patch.genre;
        book.author_id = patch.author_id;
        // stock untouched: owned by the ledger.
        Ok(book.clone())
    }

    async fn delete(&self, id: BookId) -> DomainResult<()> {
        let mut state = write_state(&self.state)?;
        if !state.books.contains_key(&id) {
            return Err(DomainError::not_found("book"));
        }
        if state.loans.iter().any(|l| l.book_id == id) {
            return Err(DomainError::conflict("book has loan history"));
        }
        state.books.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl AuthorRepository for InMemoryLibrary {
    async fn insert(&self, author: NewAuthor) -> DomainResult<Author> {
        let mut state = write_state(&self.state)?;
        let stored = Author {
            id: AuthorId::new(),
            name: author.name,
        };
        state.authors.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> DomainResult<Vec<Author>> {
        let state = read_state(&self.state)?;
        let mut authors: Vec<Author> = state.authors.values().cloned().collect();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(authors)
    }

    async fn fetch(&self, id: AuthorId) -> DomainResult<Option<Author>> {
        Ok(read_state(&self.state)?.authors.get(&id).cloned())
    }

    async fn fetch_with_books(&self, id: AuthorId) -> DomainResult<Option<AuthorWithBooks>> {
        let state = read_state(&self.state)?;
        let Some(author) = state.authors.get(&id) else {
            return Ok(None);
        };
        let mut books: Vec<Book> = state
            .books
            .values()
            .filter(|b| b.author_id == id)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(Some(AuthorWithBooks {
            author: author.clone(),
            books,
        }))
    }

    async fn delete(&self, id: AuthorId) -> DomainResult<()> {
        let mut state = write_state(&self.state)?;
        if !state.authors.contains_key(&id) {
            return Err(DomainError::not_found("author"));
        }
        if state.books.values().any(|b| b.author_id == id) {
            return Err(DomainError::conflict("author has books"));
        }
        state.authors.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryLibrary {
    async fn insert(&self, user: NewUser) -> DomainResult<User> {
        let mut state = write_state(&self.state)?;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(DomainError::conflict("username already exists"));
        }
        if state.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::conflict("email already exists"));
        }
        let stored = User {
            id: UserId::new(),
            username: user.username,
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            password_hash: user.password_hash,
            role: user.role,
        };
        state.users.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> DomainResult<Vec<User>> {
        let state = read_state(&self.state)?;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn fetch(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(read_state(&self.state)?.users.get(&id).cloned())
    }

    async fn fetch_by_login(&self, username_or_email: &str) -> DomainResult<Option<User>> {
        let state = read_state(&self.state)?;
        Ok(state
            .users
            .values()
            .find(|u| u.username == username_or_email || u.email == username_or_email)
            .cloned())
    }

    async fn delete(&self, id: UserId) -> DomainResult<()> {
        let mut state = write_state(&self.state)?;
        if !state.users.contains_key(&id) {
            return Err(DomainError::not_found("user"));
        }
        if state.loans.iter().any(|l| l.user_id == id && l.is_open()) {
            return Err(DomainError::conflict("user has open loans"));
        }
        if state.loans.iter().any(|l| l.user_id == id) {
            return Err(DomainError::conflict("user has loan history"));
        }
        state.users.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl LedgerRepository for InMemoryLibrary {
    async fn checkout(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<CheckoutReceipt> {
        let mut state = write_state(&self.state)?;
        let LibraryState {
            books,
            users,
            loans,
            ..
        } = &mut *state;

        let book = books
            .get_mut(&book_id)
            .ok_or_else(|| DomainError::not_found("book"))?;
        if book.stock <= 0 {
            return Err(DomainError::OutOfStock);
        }
        let user = users
            .get(&user_id)
            .ok_or_else(|| DomainError::not_found("user"))?;

        let loan = Loan {
            id: LoanId::new(),
            user_id,
            book_id,
            borrowed_at: now,
            returned_at: None,
        };
        loans.push(loan.clone());
        book.stock -= 1;

        Ok(CheckoutReceipt {
            loan_id: loan.id,
            book_title: book.title.clone(),
            username: user.username.clone(),
            borrowed_at: now,
        })
    }

    async fn return_copy(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> DomainResult<ReturnReceipt> {
        let mut state = write_state(&self.state)?;
        let LibraryState {
            books,
            users,
            loans,
            ..
        } = &mut *state;

        let open: Vec<Loan> = loans
            .iter()
            .filter(|l| l.user_id == user_id && l.book_id == book_id && l.is_open())
            .cloned()
            .collect();
        let resolved = resolve_open_loan(open)?;

        let book = books.get_mut(&book_id).ok_or_else(|| {
            DomainError::integrity(format!("open loan {} references missing book", resolved.id))
        })?;
        let user = users.get(&user_id).ok_or_else(|| {
            DomainError::integrity(format!("open loan {} references missing user", resolved.id))
        })?;
        let loan = loans
            .iter_mut()
            .find(|l| l.id == resolved.id)
            .ok_or_else(|| DomainError::not_found("open loan"))?;

        loan.returned_at = Some(now);
        book.stock += 1;

        Ok(ReturnReceipt {
            loan_id: loan.id,
            book_title: book.title.clone(),
            username: user.username.clone(),
            returned_at: now,
        })
    }

    async fn open_loans(&self) -> DomainResult<Vec<OpenLoanRecord>> {
        let state = read_state(&self.state)?;
        let mut records = Vec::new();
        for loan in state.loans.iter().filter(|l| l.is_open()) {
            let book = state.books.get(&loan.book_id).ok_or_else(|| {
                DomainError::integrity(format!("open loan {} references missing book", loan.id))
            })?;
            let user = state.users.get(&loan.user_id).ok_or_else(|| {
                DomainError::integrity(format!("open loan {} references missing user", loan.id))
            })?;
            records.push(OpenLoanRecord {
                loan_id: loan.id,
                book_title: book.title.clone(),
                user_name: user.display_name(),
                borrowed_at: loan.borrowed_at,
            });
        }
        records.sort_by_key(|r| r.borrowed_at);
        Ok(records)
    }

    async fn history_for_user(&self, user_id: UserId) -> DomainResult<Vec<LoanRecord>> {
        let state = read_state(&self.state)?;
        if !state.users.contains_key(&user_id) {
            return Err(DomainError::not_found("user"));
        }
        let mut records = Vec::new();
        for loan in state.loans.iter().filter(|l| l.user_id == user_id) {
            let book = state.books.get(&loan.book_id).ok_or_else(|| {
                DomainError::integrity(format!("loan {} references missing book", loan.id))
            })?;
            records.push(LoanRecord {
                loan_id: loan.id,
                book_id: loan.book_id,
                book_title: book.title.clone(),
                borrowed_at: loan.borrowed_at,
                returned_at: loan.returned_at,
            });
        }
        records.sort_by_key(|r| r.borrowed_at);
        Ok(records)
    }
}

#[async_trait]
impl SeedStore for InMemoryLibrary {
    async fn upsert_author(&self, name: &str) -> DomainResult<AuthorId> {
        let mut state = write_state(&self.state)?;
        if let Some(existing) = state.authors.values().find(|a| a.name == name) {
            return Ok(existing.id);
        }
        let author = Author {
            id: AuthorId::new(),
            name: name.to_string(),
        };
        let id = author.id;
        state.authors.insert(id, author);
        Ok(id)
    }

    async fn insert_book_if_new(&self, book: NewBook) -> DomainResult<bool> {
        let mut state = write_state(&self.state)?;
        if state.books.values().any(|b| b.isbn == book.isbn) {
            return Ok(false);
        }
        if !state.authors.contains_key(&book.author_id) {
            return Err(DomainError::not_found("author"));
        }
        let stored = Book {
            id: BookId::new(),
            title: book.title,
            isbn: book.isbn,
            publication_year: book.publication_year,
            genre: book.genre,
            stock: book.stock,
            author_id: book.author_id,
        };
        state.books.insert(stored.id, stored);
        Ok(true)
    }

    async fn purge_unreferenced(&self) -> DomainResult<PurgeReport> {
        let mut state = write_state(&self.state)?;
        let referenced: std::collections::HashSet<BookId> =
            state.loans.iter().map(|l| l.book_id).collect();

        let before_books = state.books.len();
        state.books.retain(|id, _| referenced.contains(id));
        let books_deleted = (before_books - state.books.len()) as u64;

        let authored: std::collections::HashSet<AuthorId> =
            state.books.values().map(|b| b.author_id).collect();
        let before_authors = state.authors.len();
        state.authors.retain(|id, _| authored.contains(id));
        let authors_deleted = (before_authors - state.authors.len()) as u64;

        Ok(PurgeReport {
            books_deleted,
            authors_deleted,
        })
    }
}
