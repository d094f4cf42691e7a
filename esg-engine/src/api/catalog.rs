//! Catalog endpoint
//!
//! Feeds the pickers and the map: parameter labels grouped by category, the
//! entity directory, and the analysis types.

use axum::{extract::State, routing::get, Json, Router};
use esg_common::events::{AnalysisTypeInfo, Category};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::catalog::{Entity, IndicatorMapping};
use crate::AppState;

/// GET /catalog response
#[derive(Debug, Serialize)]
pub struct CatalogResponse {
    pub parameters: BTreeMap<Category, Vec<IndicatorMapping>>,
    pub entities: Vec<Entity>,
    pub analysis_types: Vec<AnalysisTypeInfo>,
}

/// GET /catalog
pub async fn get_catalog(State(state): State<AppState>) -> Json<CatalogResponse> {
    let catalog = state.engine.catalog();
    Json(CatalogResponse {
        parameters: catalog.parameters_by_category(),
        entities: catalog.entities().to_vec(),
        analysis_types: state.engine.analysis_types(),
    })
}

pub fn catalog_routes() -> Router<AppState> {
    Router::new().route("/catalog", get(get_catalog))
}
