//! Baseline report endpoints
//!
//! Reports arrive as already-extracted statements in the extraction JSON
//! shape. Consistency findings are returned alongside the assigned id; they
//! never block registration.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use oracle_core::types::{FinancialReport, ReportId};
use oracle_core::validation::ValidationIssue;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::error::ApiError;

/// Response of `POST /api/v1/reports`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterReportResponse {
    pub id: ReportId,
    pub issues: Vec<ValidationIssue>,
}

/// Build the report routes
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/reports", post(register_report))
        .route("/api/v1/reports/{id}", get(get_report))
}

/// POST /api/v1/reports - Register a baseline report
async fn register_report(
    State(state): State<AppState>,
    payload: Result<Json<FinancialReport>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(report) = payload?;
    let registration = state.service.reports().insert(report).await;
    let response = RegisterReportResponse {
        id: registration.id,
        issues: registration.issues,
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /api/v1/reports/{id} - Fetch a registered report
async fn get_report(
    State(state): State<AppState>,
    path: Result<Path<ReportId>, axum::extract::rejection::PathRejection>,
) -> Result<Json<FinancialReport>, ApiError> {
    let Path(id) = path?;
    let report = state
        .service
        .reports()
        .get(id)
        .await
        .ok_or(ApiError::ReportNotFound(id))?;
    Ok(Json(FinancialReport::clone(&report)))
}
