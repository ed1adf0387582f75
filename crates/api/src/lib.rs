//! HTTP surface of the library service.

pub mod app;
pub mod middleware;
