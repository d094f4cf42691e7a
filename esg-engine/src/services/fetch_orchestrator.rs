//! Fetch orchestrator
//!
//! Resolves the selected parameters, then issues one request per
//! (entity, indicator) pair through an [`IndicatorSource`]. Requests run
//! concurrently via `buffer_unordered`; each failure is absorbed into a
//! "no data" observation so one bad pair never fails the cycle.

use esg_common::events::{BusEvent, ResolvedIndicatorInfo, SelectionBus, SelectionState};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::IndicatorCatalog;
use crate::error::{EngineError, EngineResult, MissingSelection};
use crate::services::worldbank_client::IndicatorSource;

/// Value of one indicator for one entity, or the lack of one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawObservation {
    pub entity_id: String,
    pub indicator_code: String,
    pub year: Option<i32>,
    /// `None` when the source had no value or the request failed
    pub value: Option<f64>,
}

/// Per-cycle request counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FetchStats {
    pub total: usize,
    pub succeeded: usize,
    pub no_data: usize,
    pub failed: usize,
}

/// Everything a fetch cycle produced
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// One entry per (entity, indicator) pair, sorted by entity then code
    pub observations: Vec<RawObservation>,
    pub stats: FetchStats,
    pub resolved: Vec<ResolvedIndicatorInfo>,
    pub unresolved: Vec<String>,
}

enum PairResult {
    Value,
    NoData,
    Failed,
}

/// Concurrent fetcher for one selection
pub struct FetchOrchestrator {
    source: Arc<dyn IndicatorSource>,
    catalog: Arc<IndicatorCatalog>,
    bus: SelectionBus,
    /// Requests in flight at once; `None` fans out the whole cycle
    max_concurrent: Option<usize>,
}

impl FetchOrchestrator {
    pub fn new(
        source: Arc<dyn IndicatorSource>,
        catalog: Arc<IndicatorCatalog>,
        bus: SelectionBus,
        max_concurrent: Option<usize>,
    ) -> Self {
        Self {
            source,
            catalog,
            bus,
            max_concurrent,
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Fetch every (entity, indicator) pair of `selection`
    ///
    /// # Errors
    /// `EmptySelection` when parameters or entities are empty. No request is
    /// issued and no progress is published in that case.
    pub async fn fetch(
        &self,
        selection: &SelectionState,
        cycle_id: u64,
    ) -> EngineResult<FetchOutcome> {
        if selection.parameters.is_empty() {
            return Err(EngineError::EmptySelection {
                missing: MissingSelection::Parameters,
            });
        }
        if selection.entities.is_empty() {
            return Err(EngineError::EmptySelection {
                missing: MissingSelection::Entities,
            });
        }

        let (resolved, unresolved) = self.resolve_parameters(selection);

        // Labels sharing a code are fetched once per entity
        let mut seen = HashSet::new();
        let codes: Vec<&str> = resolved
            .iter()
            .map(|r| r.code.as_str())
            .filter(|code| seen.insert(*code))
            .collect();

        let pairs: Vec<(String, String)> = selection
            .entities
            .iter()
            .flat_map(|entity| codes.iter().map(move |code| (entity.clone(), code.to_string())))
            .collect();
        let total = pairs.len();

        info!(
            cycle_id,
            entities = selection.entities.len(),
            indicators = codes.len(),
            requests = total,
            source = self.source.name(),
            "Fetch cycle started"
        );

        self.bus.publish(BusEvent::FetchProgress {
            cycle_id,
            completed: 0,
            total,
        });

        if total == 0 {
            return Ok(FetchOutcome {
                resolved,
                unresolved,
                ..FetchOutcome::default()
            });
        }

        let completed = Arc::new(AtomicUsize::new(0));
        let concurrency = self.max_concurrent.unwrap_or(total).max(1);

        let results: Vec<(RawObservation, PairResult)> = stream::iter(pairs)
            .map(|(entity_id, code)| {
                let source = Arc::clone(&self.source);
                let bus = self.bus.clone();
                let completed = Arc::clone(&completed);

                async move {
                    let (year, value, result) = match source.latest_value(&entity_id, &code).await {
                        Ok(Some(observation)) if observation.value.is_finite() => {
                            debug!(
                                entity = %entity_id,
                                indicator = %code,
                                year = ?observation.year,
                                value = observation.value,
                                "Indicator value fetched"
                            );
                            (observation.year, Some(observation.value), PairResult::Value)
                        }
                        Ok(Some(observation)) => {
                            warn!(
                                entity = %entity_id,
                                indicator = %code,
                                value = observation.value,
                                "Non-finite indicator value treated as no data"
                            );
                            (observation.year, None, PairResult::NoData)
                        }
                        Ok(None) => {
                            debug!(entity = %entity_id, indicator = %code, "No data in window");
                            (None, None, PairResult::NoData)
                        }
                        Err(e) => {
                            warn!(
                                entity = %entity_id,
                                indicator = %code,
                                error = %e,
                                "Indicator fetch failed"
                            );
                            (None, None, PairResult::Failed)
                        }
                    };

                    let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
                    bus.publish(BusEvent::FetchProgress {
                        cycle_id,
                        completed: current,
                        total,
                    });

                    (
                        RawObservation {
                            entity_id,
                            indicator_code: code,
                            year,
                            value,
                        },
                        result,
                    )
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let mut stats = FetchStats {
            total,
            ..FetchStats::default()
        };
        let mut observations = Vec::with_capacity(results.len());
        for (observation, result) in results {
            match result {
                PairResult::Value => stats.succeeded += 1,
                PairResult::NoData => stats.no_data += 1,
                PairResult::Failed => stats.failed += 1,
            }
            observations.push(observation);
        }
        observations.sort_by(|a, b| {
            (a.entity_id.as_str(), a.indicator_code.as_str())
                .cmp(&(b.entity_id.as_str(), b.indicator_code.as_str()))
        });

        info!(
            cycle_id,
            total = stats.total,
            succeeded = stats.succeeded,
            no_data = stats.no_data,
            failed = stats.failed,
            "Fetch cycle finished"
        );

        Ok(FetchOutcome {
            observations,
            stats,
            resolved,
            unresolved,
        })
    }

    fn resolve_parameters(
        &self,
        selection: &SelectionState,
    ) -> (Vec<ResolvedIndicatorInfo>, Vec<String>) {
        let mut resolved = Vec::new();
        let mut unresolved = Vec::new();

        for label in &selection.parameters {
            match self.catalog.resolve(label) {
                Ok(info) => {
                    info!(
                        parameter = %label,
                        indicator = %info.code,
                        category = %info.category,
                        match_kind = ?info.match_kind,
                        matched_label = %info.matched_label,
                        "Parameter resolved"
                    );
                    resolved.push(info);
                }
                Err(e) => {
                    warn!(parameter = %label, error = %e, "Parameter skipped");
                    unresolved.push(label.clone());
                }
            }
        }

        (resolved, unresolved)
    }
}
