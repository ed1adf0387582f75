use axum::{Json, Router, routing::get};

use crate::app::dto::HealthResponse;

pub fn router() -> Router {
    Router::new().route("/health", get(health))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
