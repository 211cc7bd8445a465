//! Monitoring endpoint handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use super::super::AppState;

/// Health check endpoint for container orchestration.
pub async fn health() -> impl IntoResponse {
    StatusCode::OK
}

/// Rate limit status of every tracked or configured model.
pub async fn rate_limits(State(state): State<AppState>) -> impl IntoResponse {
    let statuses = state.service.executor().tracker().all_status().await;
    Json(statuses)
}

/// Rate limit status of one model.
pub async fn rate_limit_status(
    State(state): State<AppState>,
    Path(model): Path<String>,
) -> impl IntoResponse {
    let status = state.service.executor().tracker().get_status(&model).await;
    Json(status)
}

/// Token and cost totals for a session.
pub async fn session_cost(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> impl IntoResponse {
    match state.service.costs().summary(&session_id).await {
        Some(summary) => Json(summary).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Session not found" })),
        )
            .into_response(),
    }
}
