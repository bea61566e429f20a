//! Usage aggregation pipeline.
//!
//! Pure transformations over the merged daily series: merging, range
//! filtering, totals, trends, heatmap bucketing and model distribution.

pub mod aggregator;
pub mod distribution;
pub mod heatmap;
pub mod range;
pub mod trend;

pub use aggregator::*;
pub use distribution::model_distribution;
pub use heatmap::build_heatmap;
pub use range::{filter_range, TimeRange};
pub use trend::{linear_trend, moving_average};
