//! Application assembly: configuration, the service container, and the
//! router.

pub mod dto;
pub mod errors;
pub mod routes;
mod services;

use std::sync::Arc;

use axum::{Extension, Router};
use libris_auth::TokenService;

pub use services::{AppConfig, AppServices, build_services};

/// Build the full application from configuration, connecting to storage.
pub async fn build_app(config: AppConfig) -> anyhow::Result<Router> {
    let services = build_services(&config).await?;
    Ok(build_router(&config, services))
}

/// Wire services and the token service into the router.
///
/// Split from [`build_app`] so tests can assemble the router around
/// in-memory services without touching the environment.
pub fn build_router(config: &AppConfig, services: AppServices) -> Router {
    let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.token_ttl);
    routes::router()
        .layer(Extension(Arc::new(services)))
        .layer(Extension(Arc::new(tokens)))
}
