//! Router configuration for the web server.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Largest audio upload accepted by `/api/transcribe`.
const MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        // Monitoring
        .route("/rate_limits", get(handlers::rate_limits))
        .route("/rate_limits/:model", get(handlers::rate_limit_status))
        .route("/sessions/:session_id/cost", get(handlers::session_cost))
        // Model operations
        .route(
            "/api/transcribe",
            post(handlers::transcribe).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/api/summarize", post(handlers::summarize))
        .route("/api/ask", post(handlers::ask))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
