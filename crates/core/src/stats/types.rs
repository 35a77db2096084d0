//! Types for drill statistics.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Region used for users whose profile carries no region code.
pub const UNKNOWN_REGION: &str = "UNKNOWN";

/// Counter label within a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatLabel {
    TotalUsers,
    PushEnrolled,
    ConfirmedPush,
    RejectedPush,
    TimeoutPush,
}

impl StatLabel {
    pub const ALL: [StatLabel; 5] = [
        StatLabel::TotalUsers,
        StatLabel::PushEnrolled,
        StatLabel::ConfirmedPush,
        StatLabel::RejectedPush,
        StatLabel::TimeoutPush,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StatLabel::TotalUsers => "Total Users",
            StatLabel::PushEnrolled => "PUSH ENROLLED",
            StatLabel::ConfirmedPush => "CONFIRMED PUSH",
            StatLabel::RejectedPush => "REJECTED PUSH",
            StatLabel::TimeoutPush => "TIMEOUT PUSH",
        }
    }

    /// Composite table key: `"<region> <label>"`.
    pub fn key_for(&self, region: &str) -> String {
        format!("{} {}", region, self.as_str())
    }
}

impl fmt::Display for StatLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time copy of all counters, keyed by `"<region> <label>"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsTable {
    counts: BTreeMap<String, u64>,
}

impl StatsTable {
    pub(crate) fn from_counts(counts: BTreeMap<String, u64>) -> Self {
        Self { counts }
    }

    /// Count for a composite key, 0 when the key was never incremented.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn count(&self, region: &str, label: StatLabel) -> u64 {
        self.get(&label.key_for(region))
    }

    /// Sum of one label across all regions.
    pub fn total_for(&self, label: StatLabel) -> u64 {
        let suffix = format!(" {}", label.as_str());
        self.counts
            .iter()
            .filter(|(key, _)| key.ends_with(&suffix))
            .map(|(_, count)| count)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(key, count)| (key.as_str(), *count))
    }
}

impl fmt::Display for StatsTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.counts.keys().map(String::len).max().unwrap_or(0);
        for (key, count) in &self.counts {
            writeln!(f, "  {:<width$}  {:>6}", key, count, width = width)?;
        }
        Ok(())
    }
}
