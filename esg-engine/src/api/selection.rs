//! Selection API handlers
//!
//! The write side of the map and the pickers. Every change publishes its topic
//! on the bus before the response is sent.

use axum::{
    extract::{Path, State},
    routing::{get, post, put},
    Json, Router,
};
use esg_common::events::{AnalysisMode, Selection, SelectionState};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::{error::ApiResult, AppState};

/// Response to every selection mutation
#[derive(Debug, Serialize)]
pub struct SelectionChangeResponse {
    /// False when the request left the selection as it was
    pub changed: bool,
    pub selection: Arc<SelectionState>,
}

/// PUT /selection/analysis-mode request
#[derive(Debug, Deserialize)]
pub struct AnalysisModeRequest {
    pub mode: String,
}

fn respond(state: &AppState, changed: bool) -> Json<SelectionChangeResponse> {
    Json(SelectionChangeResponse {
        changed,
        selection: state.engine.store().get(),
    })
}

/// GET /selection
pub async fn get_selection(State(state): State<AppState>) -> Json<Arc<SelectionState>> {
    Json(state.engine.store().get())
}

/// DELETE /selection
///
/// Removes every parameter and entity; the analysis mode is kept.
pub async fn clear_selection(State(state): State<AppState>) -> Json<SelectionChangeResponse> {
    let changed = state.engine.store().clear();
    respond(&state, changed)
}

/// POST /selection/parameters/:label
pub async fn add_parameter(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Json<SelectionChangeResponse> {
    if state.engine.catalog().resolve(&label).is_err() {
        warn!(parameter = %label, "Selected parameter has no indicator mapping");
    }
    let changed = state.engine.store().set(Selection::Parameter(label));
    respond(&state, changed)
}

/// DELETE /selection/parameters/:label
pub async fn remove_parameter(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Json<SelectionChangeResponse> {
    let changed = state.engine.store().unset(Selection::Parameter(label));
    respond(&state, changed)
}

/// POST /selection/entities/:id
///
/// Unknown ids are accepted (the data source may still know them) but logged.
pub async fn add_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SelectionChangeResponse> {
    if state.engine.catalog().entity(&id).is_none() {
        warn!(entity = %id, "Selected entity is not in the entity directory");
    }
    let changed = state.engine.store().set(Selection::Entity(id));
    respond(&state, changed)
}

/// DELETE /selection/entities/:id
pub async fn remove_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<SelectionChangeResponse> {
    let changed = state.engine.store().unset(Selection::Entity(id));
    respond(&state, changed)
}

/// PUT /selection/analysis-mode
///
/// Body: `{"mode": "comprehensive" | "quick"}`
pub async fn set_analysis_mode(
    State(state): State<AppState>,
    Json(request): Json<AnalysisModeRequest>,
) -> ApiResult<Json<SelectionChangeResponse>> {
    let mode: AnalysisMode = request.mode.parse()?;
    info!(mode = %mode, "Analysis mode selected");
    let changed = state.engine.store().set(Selection::AnalysisMode(mode));
    Ok(respond(&state, changed))
}

/// Build selection routes
pub fn selection_routes() -> Router<AppState> {
    Router::new()
        .route("/selection", get(get_selection).delete(clear_selection))
        .route(
            "/selection/parameters/:label",
            post(add_parameter).delete(remove_parameter),
        )
        .route(
            "/selection/entities/:id",
            post(add_entity).delete(remove_entity),
        )
        .route("/selection/analysis-mode", put(set_analysis_mode))
}

