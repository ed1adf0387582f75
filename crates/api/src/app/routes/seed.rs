//! Bulk-import seeding endpoints.

use std::sync::Arc;

use axum::extract::Path;
use axum::routing::{delete, post};
use axum::{Extension, Json, Router};

use libris_infra::{PurgeReport, SeedReport};

use crate::app::errors::ApiError;
use crate::app::services::AppServices;
use crate::middleware::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/seed/:genre/:count", post(seed_genre))
        .route("/seed", delete(purge))
}

async fn seed_genre(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
    Path((genre, count)): Path<(String, u32)>,
) -> Result<Json<SeedReport>, ApiError> {
    let report = services.seeder.seed_genre(&genre, count).await?;
    Ok(Json(report))
}

async fn purge(
    _caller: CurrentUser,
    Extension(services): Extension<Arc<AppServices>>,
) -> Result<Json<PurgeReport>, ApiError> {
    let report = services.seeder.purge().await?;
    Ok(Json(report))
}
