//! API Module
//!
//! HTTP API layer for the import service.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod extract;
pub mod health;
pub mod pipeline;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route("/pipeline/preview", post(pipeline::preview_pipeline))
        .route("/project/{key}/pipeline", get(pipeline::list_pipelines))
        .route("/project/{key}/pipeline/import", post(pipeline::import_pipeline))
        .route(
            "/project/{key}/pipeline/{pipeline_key}",
            get(pipeline::get_pipeline),
        )
        .route(
            "/project/{key}/pipeline/{pipeline_key}/export",
            get(pipeline::export_pipeline),
        )
        .route(
            "/project/{key}/pipeline/{pipeline_key}/import",
            put(pipeline::replace_pipeline),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
