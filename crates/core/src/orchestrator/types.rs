//! Types for the drill orchestrator.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::StatsTable;
use crate::verifier::Outcome;

/// Errors that stop a drill as a whole.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// No worker could ever be admitted.
    #[error("max_concurrent must be at least 1")]
    InvalidConcurrency,

    /// The admission gate was closed while dispatching.
    #[error("admission gate closed after {dispatched} users were dispatched")]
    AdmissionClosed { dispatched: usize },
}

/// Terminal result for one dispatched user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResult {
    /// Position in the input list.
    pub index: usize,
    pub email: String,
    pub region: String,
    pub outcome: Outcome,
}

/// Summary of a finished drill.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrillReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Number of users dispatched to a verifier.
    pub dispatched: usize,
    /// Highest number of verifiers active at once.
    pub peak_active: usize,
    pub outcomes: BTreeMap<Outcome, usize>,
    /// Per-user results, ordered by input position.
    pub results: Vec<UserResult>,
    pub stats: StatsTable,
}

impl DrillReport {
    pub fn outcome_count(&self, outcome: Outcome) -> usize {
        self.outcomes.get(&outcome).copied().unwrap_or(0)
    }

    pub fn total_outcomes(&self) -> usize {
        self.outcomes.values().sum()
    }
}

impl fmt::Display for DrillReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self.finished_at - self.started_at;
        writeln!(f, "Push drill report")?;
        writeln!(
            f,
            "  started {}, finished {} ({}s)",
            self.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
            duration.num_seconds()
        )?;
        writeln!(
            f,
            "  users dispatched: {}, peak concurrency: {}",
            self.dispatched, self.peak_active
        )?;

        writeln!(f, "Outcomes:")?;
        for outcome in Outcome::ALL {
            writeln!(f, "  {:<10} {:>6}", outcome.as_str(), self.outcome_count(outcome))?;
        }

        writeln!(f, "Counters:")?;
        if self.stats.is_empty() {
            writeln!(f, "  (none)")?;
        } else {
            write!(f, "{}", self.stats)?;
        }
        Ok(())
    }
}
