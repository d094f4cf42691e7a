//! Selection store
//!
//! Holds the only mutable shared state: the current [`SelectionState`].
//! Writers (map, parameter picker, analysis-type picker) call `set`/`unset`;
//! every change publishes the matching topic with the new snapshot before the
//! call returns. Changes are published in the order they were applied, so
//! the last delivered snapshot always equals the stored one. Handlers may
//! read the store but must not write to it.

use esg_common::time;
use esg_common::events::{AnalysisMode, BusEvent, Selection, SelectionBus, SelectionState};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// Current selection plus the bus its changes are published on
pub struct SelectionStore {
    state: Mutex<Arc<SelectionState>>,
    /// Held across apply-and-publish; `state` is only held while applying
    order: Mutex<()>,
    bus: SelectionBus,
}

impl SelectionStore {
    pub fn new(bus: SelectionBus) -> Self {
        Self {
            state: Mutex::new(Arc::new(SelectionState::default())),
            order: Mutex::new(()),
            bus,
        }
    }

    /// Immutable snapshot of the current selection
    pub fn get(&self) -> Arc<SelectionState> {
        Arc::clone(&*self.lock())
    }

    pub fn bus(&self) -> &SelectionBus {
        &self.bus
    }

    /// Add a parameter or entity, or choose an analysis mode
    ///
    /// Returns `false` (and publishes nothing) when the selection already
    /// contained the value.
    pub fn set(&self, selection: Selection) -> bool {
        self.mutate(&selection, |state| match &selection {
            Selection::Parameter(label) => state.parameters.insert(label.clone()),
            Selection::Entity(id) => state.entities.insert(id.clone()),
            Selection::AnalysisMode(mode) => {
                let changed = state.analysis_mode != *mode;
                state.analysis_mode = *mode;
                changed
            }
        })
    }

    /// Remove a parameter or entity
    ///
    /// Unsetting the current analysis mode restores the default mode.
    pub fn unset(&self, selection: Selection) -> bool {
        self.mutate(&selection, |state| match &selection {
            Selection::Parameter(label) => state.parameters.remove(label),
            Selection::Entity(id) => state.entities.remove(id),
            Selection::AnalysisMode(mode) => {
                if state.analysis_mode == *mode && *mode != AnalysisMode::default() {
                    state.analysis_mode = AnalysisMode::default();
                    true
                } else {
                    false
                }
            }
        })
    }

    /// Remove every parameter and entity
    ///
    /// Publishes `parameters-changed` and `entities-changed` for the halves
    /// that were non-empty. The analysis mode is kept.
    pub fn clear(&self) -> bool {
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        let (snapshot, parameters_cleared, entities_cleared) = {
            let mut guard = self.lock();
            let parameters_cleared = !guard.parameters.is_empty();
            let entities_cleared = !guard.entities.is_empty();
            if !parameters_cleared && !entities_cleared {
                return false;
            }
            let mut next = SelectionState::clone(&**guard);
            next.parameters.clear();
            next.entities.clear();
            *guard = Arc::new(next);
            (Arc::clone(&*guard), parameters_cleared, entities_cleared)
        };

        let timestamp = time::now();
        if parameters_cleared {
            self.bus.publish(BusEvent::ParametersChanged {
                selection: Arc::clone(&snapshot),
                timestamp,
            });
        }
        if entities_cleared {
            self.bus.publish(BusEvent::EntitiesChanged {
                selection: snapshot,
                timestamp,
            });
        }
        debug!("Selection cleared");
        true
    }

    /// Apply `change` to a copy of the state; publish if it reports a change
    ///
    /// The state lock is released before publishing so handlers may read the
    /// store; the order lock is kept until the event is delivered.
    fn mutate<F>(&self, selection: &Selection, change: F) -> bool
    where
        F: FnOnce(&mut SelectionState) -> bool,
    {
        let _order = self.order.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = {
            let mut guard = self.lock();
            let mut next = SelectionState::clone(&**guard);
            if !change(&mut next) {
                return false;
            }
            *guard = Arc::new(next);
            Arc::clone(&*guard)
        };

        debug!(?selection, "Selection changed");

        let timestamp = time::now();
        let event = match selection {
            Selection::Parameter(_) => BusEvent::ParametersChanged { selection: snapshot, timestamp },
            Selection::Entity(_) => BusEvent::EntitiesChanged { selection: snapshot, timestamp },
            Selection::AnalysisMode(_) => {
                BusEvent::AnalysisTypeChanged { selection: snapshot, timestamp }
            }
        };
        self.bus.publish(event);
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Arc<SelectionState>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
