//! Health check and readiness endpoints

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use super::AppState;

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Health status ("healthy" or "unhealthy")
    pub status: String,
    /// Server version
    pub version: String,
    /// Server uptime in seconds
    pub uptime_secs: u64,
    /// Scenario runs currently in flight
    pub active_runs: usize,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadyResponse {
    /// Ready status
    pub ready: bool,
}

/// Build the health routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
}

/// GET /health - Health check endpoint
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_runs: state.service.active_runs().await,
    };

    (StatusCode::OK, Json(response))
}

/// GET /ready - Readiness check endpoint
async fn ready_handler() -> impl IntoResponse {
    (StatusCode::OK, Json(ReadyResponse { ready: true }))
}
