pub mod group_aggregator;
pub mod metrics_aggregator;
pub mod recommendation_engine;
pub mod schema_normalizer;
pub mod window_filter;

pub use group_aggregator::*;
pub use metrics_aggregator::*;
pub use recommendation_engine::*;
pub use schema_normalizer::*;
pub use window_filter::*;
