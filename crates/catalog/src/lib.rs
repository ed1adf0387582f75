//! `libris-catalog` — catalog domain: books, authors, users.
//!
//! Models, boundary validation, and the storage contracts the catalog
//! endpoints run against. Stock and loans are owned by `libris-circulation`;
//! this crate only reads stock as part of a book row.

pub mod author;
pub mod book;
pub mod user;
pub mod validate;

pub use author::{Author, AuthorRepository, AuthorWithBooks, MockAuthorRepository, NewAuthor};
pub use book::{Book, BookPatch, BookRepository, BookWithAuthor, MockBookRepository, NewBook};
pub use user::{MockUserRepository, NewUser, User, UserRepository};
