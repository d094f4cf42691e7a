//! Report API handlers
//!
//! The dashboard side: run a cycle, read the last report, export it.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use esg_common::events::Report;
use serde::Serialize;
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};
use crate::export::ExportDocument;
use crate::services::report_emitter::EmitOutcome;
use crate::AppState;

/// POST /report/generate response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    /// "published" or "stale"
    pub status: String,
    pub cycle_id: u64,
    /// Present when this cycle published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<Arc<Report>>,
}

/// POST /report/generate
///
/// Runs a fetch cycle over the current selection and waits for its report.
/// Returns 400 when no parameter or no entity is selected.
pub async fn generate_report(State(state): State<AppState>) -> ApiResult<Json<GenerateResponse>> {
    let response = match state.engine.generate_report().await? {
        EmitOutcome::Published(report) => GenerateResponse {
            status: "published".to_string(),
            cycle_id: report.cycle_id,
            report: Some(report),
        },
        EmitOutcome::Stale { cycle_id, .. } => GenerateResponse {
            status: "stale".to_string(),
            cycle_id,
            report: None,
        },
    };
    Ok(Json(response))
}

/// GET /report/current
pub async fn current_report(State(state): State<AppState>) -> ApiResult<Json<Arc<Report>>> {
    state
        .engine
        .current_report()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("No report has been generated yet".to_string()))
}

/// GET /report/export
///
/// Export document of the current report, served as a JSON attachment.
pub async fn export_report(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let report = state
        .engine
        .current_report()
        .ok_or_else(|| ApiError::NotFound("No report has been generated yet".to_string()))?;

    let document = ExportDocument::new(report);
    let body = document.to_pretty_json()?;
    let disposition = format!("attachment; filename=\"{}\"", document.file_name());

    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/report/generate", post(generate_report))
        .route("/report/current", get(current_report))
        .route("/report/export", get(export_report))
}
