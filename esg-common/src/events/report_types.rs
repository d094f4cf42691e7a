//! Report type definitions
//!
//! Everything in here is plain data: no closures, no back references, so a
//! `Report` serializes as-is for export and SSE transmission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::selection_types::{AnalysisMode, SelectionState};

/// ESG category of an indicator
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Environmental,
    Social,
    Governance,
}

impl Category {
    /// All categories in report order
    pub const ALL: [Category; 3] = [Category::Environmental, Category::Social, Category::Governance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Environmental => "Environmental",
            Category::Social => "Social",
            Category::Governance => "Governance",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "environmental" => Ok(Category::Environmental),
            "social" => Ok(Category::Social),
            "governance" => Ok(Category::Governance),
            other => Err(crate::Error::InvalidInput(format!("Unknown category: {}", other))),
        }
    }
}

/// A reported score: an integer on the 0..=100 scale, or "no data"
///
/// Serializes as `{"value": 72}` or `"no_data"`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ScoreValue {
    Value(u8),
    NoData,
}

impl ScoreValue {
    /// Round a full-precision mean into a reported score
    ///
    /// `None` (nothing contributed) becomes `NoData`; it is never coerced to 0.
    pub fn from_mean(mean: Option<f64>) -> Self {
        match mean {
            Some(v) if v.is_finite() => ScoreValue::Value(v.clamp(0.0, 100.0).round() as u8),
            _ => ScoreValue::NoData,
        }
    }

    pub fn value(&self) -> Option<u8> {
        match self {
            ScoreValue::Value(v) => Some(*v),
            ScoreValue::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, ScoreValue::NoData)
    }
}

/// Score of one category on the 0..=100 scale
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryScore {
    pub category: Category,
    pub value: ScoreValue,
}

/// Per-entity scores
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityScore {
    /// Canonical entity id (country code)
    pub entity_id: String,
    /// Display name from the entity directory (falls back to the id)
    pub display_name: String,
    pub environmental: ScoreValue,
    pub social: ScoreValue,
    pub governance: ScoreValue,
    /// Mean of the categories that have data
    pub overall: ScoreValue,
}

impl EntityScore {
    pub fn category(&self, category: Category) -> ScoreValue {
        match category {
            Category::Environmental => self.environmental,
            Category::Social => self.social,
            Category::Governance => self.governance,
        }
    }

    /// Scores as a list, in report order
    pub fn category_scores(&self) -> Vec<CategoryScore> {
        Category::ALL
            .iter()
            .map(|&category| CategoryScore { category, value: self.category(category) })
            .collect()
    }
}

/// Global scores across all entities
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct OverallScores {
    pub environmental: ScoreValue,
    pub social: ScoreValue,
    pub governance: ScoreValue,
    pub overall: ScoreValue,
}

impl OverallScores {
    /// Every score is "no data"
    pub fn no_data() -> Self {
        Self {
            environmental: ScoreValue::NoData,
            social: ScoreValue::NoData,
            governance: ScoreValue::NoData,
            overall: ScoreValue::NoData,
        }
    }

    pub fn category(&self, category: Category) -> ScoreValue {
        match category {
            Category::Environmental => self.environmental,
            Category::Social => self.social,
            Category::Governance => self.governance,
        }
    }
}

/// Recommendation priority
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// Rule-based recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub text: String,
    pub priority: Priority,
}

/// How a parameter label was resolved to an indicator code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    /// Label found verbatim in the catalog
    Exact,
    /// Label matched a catalog label by first-token substring
    Fuzzy,
}

/// Resolution record for one selected parameter
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedIndicatorInfo {
    /// Label as selected
    pub label: String,
    /// Indicator code
    pub code: String,
    pub category: Category,
    pub match_kind: MatchKind,
    /// Catalog label that produced the match
    pub matched_label: String,
}

/// Provenance of a report
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceMeta {
    /// Data source name
    pub source: String,
    /// When the fetch cycle started
    pub started_at: DateTime<Utc>,
    pub analysis_mode: AnalysisMode,
    /// Requests issued (one per entity and resolved indicator)
    pub total_requests: usize,
    /// Requests that returned a value
    pub succeeded_requests: usize,
    /// Requests that succeeded but carried no non-null value
    pub no_data_requests: usize,
    /// Requests that failed (network, HTTP status, payload)
    pub failed_requests: usize,
    pub resolved_indicators: Vec<ResolvedIndicatorInfo>,
    /// Selected labels with no indicator code
    pub unresolved_parameters: Vec<String>,
}

/// Consolidated score report of one fetch cycle
///
/// Constructed in full before publication and immutable afterwards; the bus
/// carries it behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    /// Fetch cycle sequence id
    pub cycle_id: u64,
    /// Selection the cycle ran against (after analysis-mode limits)
    pub selection: SelectionState,
    pub entity_scores: Vec<EntityScore>,
    pub overall: OverallScores,
    pub recommendations: Vec<Recommendation>,
    pub source_meta: SourceMeta,
}

impl Report {
    /// False when every score in the report is "no data"
    pub fn has_scores(&self) -> bool {
        !self.overall.overall.is_no_data()
    }
}
