//! Per-region drill counters.
//!
//! Workers fold their results into a shared [`StatsAggregator`]; the final
//! [`StatsTable`] snapshot is what the drill report prints.

mod aggregator;
mod types;

pub use aggregator::StatsAggregator;
pub use types::{StatLabel, StatsTable, UNKNOWN_REGION};
