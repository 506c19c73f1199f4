//! API Module
//!
//! HTTP API layer for the orchestrator.

pub mod error;
pub mod health;
pub mod job;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::service::JobTracker;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    pub tracker: JobTracker,
}

/// Create the main API router with all endpoints
pub fn create_router(tracker: JobTracker) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api = Router::new()
        .route("/analyze", post(job::analyze))
        .route("/status/{job_id}", get(job::get_status))
        .layer(cors);

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api)
        .with_state(AppState { tracker })
        .layer(TraceLayer::new_for_http())
}
