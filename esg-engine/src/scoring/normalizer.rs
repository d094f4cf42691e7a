//! Indicator normalization onto the 0..=100 scale

use esg_common::events::Category;

/// Lower bound of World Bank governance estimates
pub const GOVERNANCE_MIN: f64 = -2.5;

/// Width of the governance estimate range (-2.5..=2.5)
pub const GOVERNANCE_SPAN: f64 = 5.0;

/// Map a raw indicator value onto 0..=100
///
/// Governance estimates are rescaled linearly from -2.5..=2.5. Environmental
/// and social indicators are taken as already on a percentage-like scale and
/// only clamped. Non-finite input yields `None`.
pub fn normalize(category: Category, value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }

    let scaled = match category {
        Category::Governance => (value - GOVERNANCE_MIN) / GOVERNANCE_SPAN * 100.0,
        Category::Environmental | Category::Social => value,
    };

    Some(scaled.clamp(0.0, 100.0))
}
