//! Lock-guarded counter table shared by drill workers.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::types::{StatLabel, StatsTable};

/// Thread-safe counters keyed by `(region, label)`.
///
/// A single mutex guards the whole table; each increment holds it for one map
/// update, so contention stays negligible even with many workers.
#[derive(Debug, Default)]
pub struct StatsAggregator {
    counts: Mutex<BTreeMap<(String, StatLabel), u64>>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    // A panicking worker must not take the counters down with it.
    fn table(&self) -> MutexGuard<'_, BTreeMap<(String, StatLabel), u64>> {
        self.counts.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn increment(&self, region: &str, label: StatLabel) {
        *self.table().entry((region.to_string(), label)).or_insert(0) += 1;
    }

    pub fn count(&self, region: &str, label: StatLabel) -> u64 {
        self.table()
            .get(&(region.to_string(), label))
            .copied()
            .unwrap_or(0)
    }

    /// Copy of every counter. Meant to be read once all workers are done.
    pub fn snapshot(&self) -> StatsTable {
        let counts = self
            .table()
            .iter()
            .map(|((region, label), count)| (label.key_for(region), *count))
            .collect();
        StatsTable::from_counts(counts)
    }
}
