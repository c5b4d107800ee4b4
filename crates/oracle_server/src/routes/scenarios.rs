//! Scenario endpoints
//!
//! Creation answers `202 Accepted` with the PENDING scenario; the run proceeds
//! in the background and clients poll `/status` until a terminal state.

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use oracle_core::types::{CreateScenarioRequest, Scenario, ScenarioId, StatusSnapshot};
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

/// Reason recorded when a cancel request carries none
pub const DEFAULT_CANCEL_REASON: &str = "cancelled by client";

/// Optional body of `POST /api/v1/scenarios/{id}/cancel`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CancelRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Acknowledgement of a cancel request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub id: ScenarioId,
    pub reason: String,
}

/// Build the scenario routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/scenarios", post(create_scenario))
        .route("/api/v1/scenarios/{id}", get(get_scenario))
        .route("/api/v1/scenarios/{id}/status", get(get_status))
        .route("/api/v1/scenarios/{id}/cancel", post(cancel_scenario))
        .route("/api/v1/scenarios/{id}/report", get(get_report_document))
}

/// POST /api/v1/scenarios - Create and start a scenario
async fn create_scenario(
    State(state): State<AppState>,
    payload: Result<Json<CreateScenarioRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let scenario = state.service.create_scenario(request).await?;
    Ok((StatusCode::ACCEPTED, Json(scenario)))
}

/// GET /api/v1/scenarios/{id} - Full scenario with every committed result
async fn get_scenario(
    State(state): State<AppState>,
    path: Result<Path<ScenarioId>, PathRejection>,
) -> Result<Json<Scenario>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.service.get_scenario(id).await?))
}

/// GET /api/v1/scenarios/{id}/status - Status, progress and error message
async fn get_status(
    State(state): State<AppState>,
    path: Result<Path<ScenarioId>, PathRejection>,
) -> Result<Json<StatusSnapshot>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.service.get_scenario_status(id).await?))
}

/// POST /api/v1/scenarios/{id}/cancel - Cancel an active run
async fn cancel_scenario(
    State(state): State<AppState>,
    path: Result<Path<ScenarioId>, PathRejection>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let request: CancelRequest = if body.iter().all(u8::is_ascii_whitespace) {
        CancelRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ApiError::BadRequest(e.to_string()))?
    };
    let reason = request
        .reason
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_CANCEL_REASON.to_string());

    state.service.cancel(id, reason.clone()).await?;
    Ok((StatusCode::ACCEPTED, Json(CancelResponse { id, reason })))
}

/// GET /api/v1/scenarios/{id}/report - Rendered report of a completed scenario
async fn get_report_document(
    State(state): State<AppState>,
    path: Result<Path<ScenarioId>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path(id) = path?;
    let document = state.service.generate_report(id).await?;
    let content_type = state.service.renderer().content_type();
    Ok(([(header::CONTENT_TYPE, content_type)], document))
}
