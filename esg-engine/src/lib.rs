//! esg-engine library interface
//!
//! Selection store, indicator catalog, fetch orchestrator, scoring and report
//! emitter behind an [`engine::EsgEngine`] facade, plus the HTTP/SSE surface.

pub mod api;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod export;
pub mod scoring;
pub mod selection_store;
pub mod services;

pub use crate::engine::EsgEngine;
pub use crate::error::{ApiError, ApiResult, EngineError, EngineResult};

use axum::Router;
use chrono::{DateTime, Utc};
use esg_common::time;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EsgEngine>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(engine: Arc<EsgEngine>) -> Self {
        Self {
            engine,
            startup_time: time::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::health_routes())
        .merge(api::catalog_routes())
        .merge(api::selection_routes())
        .merge(api::report_routes())
        .route("/events", get(api::event_stream))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
