//! Selection type definitions
//!
//! The selection is what the map, parameter picker and analysis-type picker
//! write and what the dashboard reads. Membership is all that matters, so the
//! sets are ordered only to make snapshots and quick-mode truncation
//! deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Analysis mode chosen on the analysis-type picker
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Full report over the whole selection
    #[default]
    Comprehensive,
    /// Reduced report over the first few parameters and entities
    Quick,
}

impl AnalysisMode {
    /// All modes in picker order
    pub const ALL: [AnalysisMode; 2] = [AnalysisMode::Comprehensive, AnalysisMode::Quick];

    /// Wire code of the mode
    pub fn code(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive => "comprehensive",
            AnalysisMode::Quick => "quick",
        }
    }

    /// Human-readable name shown on the picker card
    pub fn display_name(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive => "Full Report",
            AnalysisMode::Quick => "Quick Analysis",
        }
    }

    /// Picker card description
    pub fn description(&self) -> &'static str {
        match self {
            AnalysisMode::Comprehensive => {
                "Score every selected parameter for every selected entity"
            }
            AnalysisMode::Quick => {
                "Score the first few parameters for the first few entities"
            }
        }
    }
}

impl std::fmt::Display for AnalysisMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for AnalysisMode {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "comprehensive" => Ok(AnalysisMode::Comprehensive),
            "quick" => Ok(AnalysisMode::Quick),
            other => Err(crate::Error::InvalidInput(format!(
                "Unknown analysis mode: {}",
                other
            ))),
        }
    }
}

/// Analysis type descriptor for picker surfaces
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnalysisTypeInfo {
    pub mode: AnalysisMode,
    pub name: String,
    pub description: String,
    pub is_default: bool,
}

impl From<AnalysisMode> for AnalysisTypeInfo {
    fn from(mode: AnalysisMode) -> Self {
        Self {
            mode,
            name: mode.display_name().to_string(),
            description: mode.description().to_string(),
            is_default: mode == AnalysisMode::default(),
        }
    }
}

/// One selectable item, as written by a UI surface
///
/// The variant is the "kind" of the selection, the payload its value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Selection {
    /// Parameter label (as shown on the parameter picker)
    Parameter(String),
    /// Entity id (canonical country code)
    Entity(String),
    /// Analysis mode
    AnalysisMode(AnalysisMode),
}

/// Current selection across all surfaces
///
/// Snapshots of this struct are handed out behind an `Arc` and never mutated
/// after publication.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectionState {
    /// Chosen parameter labels
    pub parameters: BTreeSet<String>,
    /// Chosen entity ids
    pub entities: BTreeSet<String>,
    /// Chosen analysis mode
    pub analysis_mode: AnalysisMode,
}

impl SelectionState {
    /// True when neither parameters nor entities are chosen
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.entities.is_empty()
    }

    /// Copy of this selection limited to the first `max_parameters` parameters
    /// and `max_entities` entities (in sorted order)
    pub fn truncated(&self, max_parameters: usize, max_entities: usize) -> SelectionState {
        SelectionState {
            parameters: self.parameters.iter().take(max_parameters).cloned().collect(),
            entities: self.entities.iter().take(max_entities).cloned().collect(),
            analysis_mode: self.analysis_mode,
        }
    }
}
