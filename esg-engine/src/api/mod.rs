//! HTTP API handlers for esg-engine
//!
//! REST endpoints for the UI surfaces (map, parameter picker, analysis-type
//! picker, dashboard) plus an SSE stream of every bus event.

pub mod catalog;
pub mod health;
pub mod report;
pub mod selection;
pub mod sse;

pub use catalog::catalog_routes;
pub use health::health_routes;
pub use report::report_routes;
pub use selection::selection_routes;
pub use sse::event_stream;
