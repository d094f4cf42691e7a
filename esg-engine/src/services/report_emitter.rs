//! Report emitter
//!
//! Hands out fetch cycle ids and publishes each completed cycle's report on
//! `report-ready`. A cycle that completes after a newer one has already
//! published is stale and dropped.

use esg_common::time;
use esg_common::events::{
    BusEvent, EntityScore, OverallScores, Recommendation, Report, SelectionBus, SelectionState,
    SourceMeta,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{info, warn};

/// Report contents, minus the publication stamp
#[derive(Debug, Clone)]
pub struct ReportParts {
    pub selection: SelectionState,
    pub entity_scores: Vec<EntityScore>,
    pub overall: OverallScores,
    pub recommendations: Vec<Recommendation>,
    pub source_meta: SourceMeta,
}

/// Result of [`ReportEmitter::emit`]
#[derive(Debug, Clone)]
pub enum EmitOutcome {
    /// Report stamped and published on `report-ready`
    Published(Arc<Report>),
    /// A newer cycle already published; nothing was published
    Stale { cycle_id: u64, last_published: u64 },
}

impl EmitOutcome {
    pub fn report(&self) -> Option<&Arc<Report>> {
        match self {
            EmitOutcome::Published(report) => Some(report),
            EmitOutcome::Stale { .. } => None,
        }
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, EmitOutcome::Stale { .. })
    }
}

pub struct ReportEmitter {
    bus: SelectionBus,
    next_cycle: AtomicU64,
    /// Id of the last published cycle; held across publication so reports
    /// reach subscribers in cycle order
    last_published: Mutex<u64>,
    current: Mutex<Option<Arc<Report>>>,
}

impl ReportEmitter {
    pub fn new(bus: SelectionBus) -> Self {
        Self {
            bus,
            next_cycle: AtomicU64::new(1),
            last_published: Mutex::new(0),
            current: Mutex::new(None),
        }
    }

    /// Start a new fetch cycle; ids increase monotonically from 1
    pub fn begin_cycle(&self) -> u64 {
        self.next_cycle.fetch_add(1, Ordering::SeqCst)
    }

    /// Stamp and publish a completed cycle's report
    pub fn emit(&self, cycle_id: u64, parts: ReportParts) -> EmitOutcome {
        let mut last_published = self
            .last_published
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if cycle_id <= *last_published {
            warn!(
                cycle_id,
                last_published = *last_published,
                "Stale fetch cycle completed, report dropped"
            );
            return EmitOutcome::Stale {
                cycle_id,
                last_published: *last_published,
            };
        }

        let report = Arc::new(Report {
            generated_at: time::now(),
            cycle_id,
            selection: parts.selection,
            entity_scores: parts.entity_scores,
            overall: parts.overall,
            recommendations: parts.recommendations,
            source_meta: parts.source_meta,
        });

        *last_published = cycle_id;
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&report));

        info!(
            cycle_id,
            entities = report.entity_scores.len(),
            recommendations = report.recommendations.len(),
            has_scores = report.has_scores(),
            "Report published"
        );

        self.bus.publish(BusEvent::ReportReady {
            report: Arc::clone(&report),
        });

        EmitOutcome::Published(report)
    }

    /// Last published report
    pub fn current(&self) -> Option<Arc<Report>> {
        self.current
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
