//! Threshold-based recommendations

use esg_common::config::RecommendationThresholds;
use esg_common::events::{Priority, Recommendation};

use super::aggregator::CategoryMeans;

/// Evaluates global scores against configured thresholds
///
/// Rules run in a fixed order (environmental, social, governance, overall)
/// and each fires independently when its score is strictly below the
/// threshold. A score with no data fires nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecommendationPolicy {
    thresholds: RecommendationThresholds,
}

impl RecommendationPolicy {
    pub fn new(thresholds: RecommendationThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &RecommendationThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, global: &CategoryMeans) -> Vec<Recommendation> {
        let rules = [
            (
                global.environmental,
                self.thresholds.environmental,
                "Improve environmental sustainability measures",
                Priority::High,
            ),
            (
                global.social,
                self.thresholds.social,
                "Enhance social development programs",
                Priority::Medium,
            ),
            (
                global.governance,
                self.thresholds.governance,
                "Strengthen governance and transparency",
                Priority::High,
            ),
            (
                global.overall,
                self.thresholds.overall,
                "Develop comprehensive ESG strategy",
                Priority::High,
            ),
        ];

        rules
            .into_iter()
            .filter_map(|(score, threshold, text, priority)| match score {
                Some(score) if score < threshold => Some(Recommendation {
                    text: text.to_string(),
                    priority,
                }),
                _ => None,
            })
            .collect()
    }
}
