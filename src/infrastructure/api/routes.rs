//! HTTP API routes: job submission and status polling.

use crate::application::jobs::JobRunner;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobRunner>,
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/analyze", post(start_analyze))
        .route("/api/status", get(get_status))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn start_analyze(State(state): State<AppState>) -> impl IntoResponse {
    match state.jobs.start_scan() {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "started" })),
        ),
        Err(e) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

async fn get_status(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.jobs.snapshot())
}
