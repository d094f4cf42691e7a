//! Engine facade
//!
//! Wires the selection store, fetch orchestrator, scoring and report emitter
//! together. A report cycle is:
//!
//! 1. Snapshot the selection and apply analysis-mode limits
//! 2. Take a cycle id
//! 3. Fetch every (entity, indicator) pair
//! 4. Aggregate and evaluate recommendations
//! 5. Emit (dropped if a newer cycle already published)

use esg_common::config::EngineConfig;
use esg_common::events::{AnalysisMode, AnalysisTypeInfo, Report, SelectionBus, SelectionState, SourceMeta};
use esg_common::time;
use std::sync::Arc;
use tracing::{info, warn};

use crate::catalog::IndicatorCatalog;
use crate::error::EngineResult;
use crate::scoring::{aggregate, RecommendationPolicy};
use crate::selection_store::SelectionStore;
use crate::services::fetch_orchestrator::FetchOrchestrator;
use crate::services::report_emitter::{EmitOutcome, ReportEmitter, ReportParts};
use crate::services::worldbank_client::{IndicatorSource, WorldBankClient};

/// ESG scoring engine
pub struct EsgEngine {
    config: EngineConfig,
    catalog: Arc<IndicatorCatalog>,
    bus: SelectionBus,
    store: SelectionStore,
    orchestrator: FetchOrchestrator,
    emitter: ReportEmitter,
    policy: RecommendationPolicy,
}

impl EsgEngine {
    /// Build an engine around an explicit catalog and indicator source
    pub fn new(
        config: EngineConfig,
        catalog: Arc<IndicatorCatalog>,
        source: Arc<dyn IndicatorSource>,
    ) -> Self {
        let bus = SelectionBus::new(config.bus_capacity);
        let orchestrator = FetchOrchestrator::new(
            source,
            Arc::clone(&catalog),
            bus.clone(),
            config.max_concurrent_requests,
        );

        Self {
            policy: RecommendationPolicy::new(config.thresholds),
            store: SelectionStore::new(bus.clone()),
            emitter: ReportEmitter::new(bus.clone()),
            orchestrator,
            catalog,
            bus,
            config,
        }
    }

    /// Build an engine on the World Bank API with the configured catalog
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        let catalog = match &config.catalog_path {
            Some(path) => IndicatorCatalog::load(path)?,
            None => IndicatorCatalog::builtin(),
        };
        let source = WorldBankClient::new(&config)?;

        Ok(Self::new(config, Arc::new(catalog), Arc::new(source)))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &IndicatorCatalog {
        &self.catalog
    }

    pub fn bus(&self) -> &SelectionBus {
        &self.bus
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    /// Analysis types offered on the picker
    pub fn analysis_types(&self) -> Vec<AnalysisTypeInfo> {
        AnalysisMode::ALL.into_iter().map(AnalysisTypeInfo::from).collect()
    }

    /// Last published report
    pub fn current_report(&self) -> Option<Arc<Report>> {
        self.emitter.current()
    }

    /// Selection a cycle actually runs against
    ///
    /// Quick analysis keeps the first few parameters and entities; the
    /// entity cap applies to every mode.
    pub fn effective_selection(&self, selection: &SelectionState) -> SelectionState {
        let limited = match selection.analysis_mode {
            AnalysisMode::Quick => selection.truncated(
                self.config.quick_max_parameters,
                self.config.quick_max_entities,
            ),
            AnalysisMode::Comprehensive => selection.clone(),
        };

        match self.config.max_entities {
            Some(max) if limited.entities.len() > max => {
                warn!(
                    selected = limited.entities.len(),
                    max_entities = max,
                    "Entity selection capped"
                );
                limited.truncated(usize::MAX, max)
            }
            _ => limited,
        }
    }

    /// Run a cycle over the current selection
    pub async fn generate_report(&self) -> EngineResult<EmitOutcome> {
        let snapshot = self.store.get();
        self.generate_for(&snapshot).await
    }

    /// Run a cycle over an explicit selection
    ///
    /// # Errors
    /// `EmptySelection` when parameters or entities are empty; no request is
    /// issued.
    pub async fn generate_for(&self, selection: &SelectionState) -> EngineResult<EmitOutcome> {
        let selection = self.effective_selection(selection);
        let started_at = time::now();
        let cycle_id = self.emitter.begin_cycle();

        info!(
            cycle_id,
            analysis_mode = %selection.analysis_mode,
            parameters = selection.parameters.len(),
            entities = selection.entities.len(),
            "Report cycle started"
        );

        let outcome = self.orchestrator.fetch(&selection, cycle_id).await?;
        let aggregation = aggregate(&outcome.observations, &outcome.resolved, &selection.entities);

        if aggregation.is_empty() {
            warn!(cycle_id, "No scorable data for the selection");
        }

        let entity_scores = aggregation
            .entities
            .iter()
            .map(|e| e.to_entity_score(&self.catalog))
            .collect();
        let recommendations = self.policy.evaluate(&aggregation.global);

        let source_meta = SourceMeta {
            source: self.orchestrator.source_name().to_string(),
            started_at,
            analysis_mode: selection.analysis_mode,
            total_requests: outcome.stats.total,
            succeeded_requests: outcome.stats.succeeded,
            no_data_requests: outcome.stats.no_data,
            failed_requests: outcome.stats.failed,
            resolved_indicators: outcome.resolved,
            unresolved_parameters: outcome.unresolved,
        };

        Ok(self.emitter.emit(
            cycle_id,
            ReportParts {
                overall: aggregation.global.to_overall_scores(),
                selection,
                entity_scores,
                recommendations,
                source_meta,
            },
        ))
    }
}
