//! Aggregation engine
//!
//! Group-by summaries of a measurement per category, and quantile binning
//! of numeric series into ordered categorical labels. Both are pure
//! functions over in-memory columns.

mod binning;
mod errors;
mod group;
mod stats;

pub use binning::{bin, Bin, BinnedSeries, DEFAULT_NUM_BINS, MAX_NUM_BINS};
pub use errors::{AggregateError, AggregateResult};
pub use group::{aggregate, AggregationResult, AggregationRow};
pub use stats::{mean, quantile_sorted, std_dev};
