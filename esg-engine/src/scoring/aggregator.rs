//! Per-entity and global score aggregation
//!
//! Means are kept at full precision; rounding happens only when the report is
//! built. A category nothing contributed to stays `None` ("no data") and is
//! left out of every mean above it.

use esg_common::events::{Category, EntityScore, OverallScores, ResolvedIndicatorInfo, ScoreValue};
use std::collections::{BTreeSet, HashMap};

use super::normalizer::normalize;
use crate::catalog::IndicatorCatalog;
use crate::services::fetch_orchestrator::RawObservation;

/// Full-precision category means; `None` is "no data"
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CategoryMeans {
    pub environmental: Option<f64>,
    pub social: Option<f64>,
    pub governance: Option<f64>,
    pub overall: Option<f64>,
}

impl CategoryMeans {
    pub fn category(&self, category: Category) -> Option<f64> {
        match category {
            Category::Environmental => self.environmental,
            Category::Social => self.social,
            Category::Governance => self.governance,
        }
    }

    fn set_category(&mut self, category: Category, value: Option<f64>) {
        match category {
            Category::Environmental => self.environmental = value,
            Category::Social => self.social = value,
            Category::Governance => self.governance = value,
        }
    }

    /// Mean of the categories that have data
    fn with_overall(mut self) -> Self {
        self.overall = mean(Category::ALL.iter().filter_map(|&c| self.category(c)).collect());
        self
    }

    pub fn to_overall_scores(&self) -> OverallScores {
        OverallScores {
            environmental: ScoreValue::from_mean(self.environmental),
            social: ScoreValue::from_mean(self.social),
            governance: ScoreValue::from_mean(self.governance),
            overall: ScoreValue::from_mean(self.overall),
        }
    }
}

/// Aggregated scores of one entity
#[derive(Debug, Clone, PartialEq)]
pub struct EntityAggregate {
    pub entity_id: String,
    pub means: CategoryMeans,
}

impl EntityAggregate {
    pub fn to_entity_score(&self, catalog: &IndicatorCatalog) -> EntityScore {
        let scores = self.means.to_overall_scores();
        EntityScore {
            entity_id: self.entity_id.clone(),
            display_name: catalog.display_name(&self.entity_id),
            environmental: scores.environmental,
            social: scores.social,
            governance: scores.governance,
            overall: scores.overall,
        }
    }
}

/// Result of aggregating one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// One entry per selected entity, in id order
    pub entities: Vec<EntityAggregate>,
    pub global: CategoryMeans,
}

impl Aggregation {
    /// True when no entity scored in any category
    pub fn is_empty(&self) -> bool {
        self.global.overall.is_none()
    }
}

/// Mean of `values` summed in ascending order, so the result does not depend
/// on the order observations arrived in
fn mean(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let sum: f64 = values.iter().sum();
    Some(sum / values.len() as f64)
}

/// Aggregate a cycle's observations
///
/// `resolved` supplies the category of each indicator code; observations for
/// codes not in it are ignored. Every entity in `entities` gets an entry, with
/// "no data" where nothing was observed.
pub fn aggregate(
    observations: &[RawObservation],
    resolved: &[ResolvedIndicatorInfo],
    entities: &BTreeSet<String>,
) -> Aggregation {
    let mut categories: HashMap<&str, Category> = HashMap::new();
    for info in resolved {
        categories.entry(info.code.as_str()).or_insert(info.category);
    }

    // entity → category → normalized values
    let mut buckets: HashMap<&str, HashMap<Category, Vec<f64>>> = HashMap::new();
    for observation in observations {
        let Some(value) = observation.value else {
            continue;
        };
        let Some(&category) = categories.get(observation.indicator_code.as_str()) else {
            continue;
        };
        if let Some(normalized) = normalize(category, value) {
            buckets
                .entry(observation.entity_id.as_str())
                .or_default()
                .entry(category)
                .or_default()
                .push(normalized);
        }
    }

    let entity_aggregates: Vec<EntityAggregate> = entities
        .iter()
        .map(|entity_id| {
            let mut means = CategoryMeans::default();
            if let Some(by_category) = buckets.get_mut(entity_id.as_str()) {
                for category in Category::ALL {
                    let values = by_category.remove(&category).unwrap_or_default();
                    means.set_category(category, mean(values));
                }
            }
            EntityAggregate {
                entity_id: entity_id.clone(),
                means: means.with_overall(),
            }
        })
        .collect();

    let mut global = CategoryMeans::default();
    for category in Category::ALL {
        let values = entity_aggregates
            .iter()
            .filter_map(|e| e.means.category(category))
            .collect();
        global.set_category(category, mean(values));
    }
    global.overall = mean(
        entity_aggregates
            .iter()
            .filter_map(|e| e.means.overall)
            .collect(),
    );

    Aggregation {
        entities: entity_aggregates,
        global,
    }
}
