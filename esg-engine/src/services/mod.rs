//! Engine services: data source client, fetch orchestration, report emission

pub mod fetch_orchestrator;
pub mod report_emitter;
pub mod worldbank_client;

pub use fetch_orchestrator::{FetchOrchestrator, FetchOutcome, FetchStats, RawObservation};
pub use report_emitter::{EmitOutcome, ReportEmitter, ReportParts};
pub use worldbank_client::{FetchFailure, IndicatorSource, Observation, WorldBankClient};
