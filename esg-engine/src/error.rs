//! Error types for esg-engine
//!
//! Per-pair fetch failures never reach these types: the orchestrator absorbs
//! them into "no data" observations. What remains is what a caller can act on.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::worldbank_client::FetchFailure;

/// Which half of the selection is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSelection {
    Parameters,
    Entities,
}

impl std::fmt::Display for MissingSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MissingSelection::Parameters => {
                f.write_str("Please select at least one ESG parameter to analyze.")
            }
            MissingSelection::Entities => {
                f.write_str("Please select at least one country to analyze.")
            }
        }
    }
}

/// Catalog errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// Label has no indicator code (skipped, not fatal)
    #[error("No indicator matches parameter '{0}'")]
    ResolutionMiss(String),

    /// Two catalog rows share a label within one category
    #[error("Duplicate catalog label '{label}' in category {category}")]
    DuplicateLabel { label: String, category: String },

    /// Catalog source could not be read or parsed
    #[error("Catalog load failed: {0}")]
    Load(String),
}

/// Engine errors surfaced to callers
#[derive(Debug, Error)]
pub enum EngineError {
    /// Nothing to fetch; rejected before any request is issued
    #[error("Empty selection: {missing}")]
    EmptySelection { missing: MissingSelection },

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Indicator source could not be constructed
    #[error("Indicator source error: {0}")]
    Source(#[from] FetchFailure),

    #[error("Common error: {0}")]
    Common(#[from] esg_common::Error),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Resource not found (404)
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Engine error
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
            ApiError::Engine(EngineError::EmptySelection { missing }) => {
                (StatusCode::BAD_REQUEST, "EMPTY_SELECTION", missing.to_string())
            }
            ApiError::Engine(ref err @ EngineError::Catalog(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "CATALOG_ERROR", err.to_string())
            }
            ApiError::Engine(ref err @ EngineError::Source(_)) => {
                (StatusCode::BAD_GATEWAY, "SOURCE_ERROR", err.to_string())
            }
            ApiError::Engine(ref err @ EngineError::Common(_)) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "COMMON_ERROR", err.to_string())
            }
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

impl From<esg_common::Error> for ApiError {
    fn from(err: esg_common::Error) -> Self {
        match err {
            esg_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            esg_common::Error::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Engine(EngineError::Common(other)),
        }
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
