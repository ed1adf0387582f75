//! Route modules, one per resource.

pub mod auth;
pub mod authors;
pub mod books;
pub mod borrow;
pub mod seed;
pub mod system;
pub mod users;

use axum::Router;

pub fn router() -> Router {
    Router::new()
        .merge(system::router())
        .merge(auth::router())
        .merge(books::router())
        .merge(authors::router())
        .merge(users::router())
        .merge(borrow::router())
        .merge(seed::router())
}
