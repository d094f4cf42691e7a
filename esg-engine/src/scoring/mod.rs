//! Scoring: normalization, aggregation, recommendations
//!
//! Pure functions over raw observations. Nothing here touches the bus or the
//! network, and results depend only on the multiset of observations, never on
//! the order requests completed in.

pub mod aggregator;
pub mod normalizer;
pub mod recommendations;

pub use aggregator::{aggregate, Aggregation, CategoryMeans, EntityAggregate};
pub use normalizer::normalize;
pub use recommendations::RecommendationPolicy;
