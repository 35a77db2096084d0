//! Drill orchestrator implementation.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::DrillConfig;
use crate::directory::UserRecord;
use crate::verifier::{CancelSignal, Outcome, PushVerifier};

use super::types::{DrillReport, OrchestratorError, UserResult};

/// Tracks how many units are past admission and not yet released.
#[derive(Debug, Default)]
struct ActivityGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActivityGauge {
    fn enter(self: &Arc<Self>) -> ActiveUnit {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveUnit(Arc::clone(self))
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

struct ActiveUnit(Arc<ActivityGauge>);

impl Drop for ActiveUnit {
    fn drop(&mut self) {
        self.0.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs one push verification per user with at most `max_concurrent` in flight.
pub struct DrillOrchestrator {
    config: DrillConfig,
    verifier: Arc<PushVerifier>,
}

impl DrillOrchestrator {
    /// Create a new orchestrator.
    pub fn new(config: DrillConfig, verifier: Arc<PushVerifier>) -> Self {
        Self { config, verifier }
    }

    /// Run the drill over `users` and wait for every unit to finish.
    ///
    /// Per-user failures never abort the run; they are tallied as
    /// [`Outcome::Error`].
    pub async fn run(
        &self,
        users: Vec<UserRecord>,
        cancel: CancelSignal,
    ) -> Result<DrillReport, OrchestratorError> {
        if self.config.max_concurrent == 0 {
            return Err(OrchestratorError::InvalidConcurrency);
        }

        let gate = Arc::new(Semaphore::new(self.config.max_concurrent));
        let gauge = Arc::new(ActivityGauge::default());
        let start_delay = self.config.worker_start_delay();
        let started_at = Utc::now();
        let dispatched = users.len();

        info!(
            "Starting push drill for {} users ({} in parallel)",
            dispatched, self.config.max_concurrent
        );

        let mut units = JoinSet::new();
        let mut meta = Vec::with_capacity(dispatched);

        for (index, user) in users.into_iter().enumerate() {
            let permit = Arc::clone(&gate)
                .acquire_owned()
                .await
                .map_err(|_| OrchestratorError::AdmissionClosed { dispatched: index })?;

            info!("Processing user {} ({})", index, user.email);
            meta.push((user.email.clone(), user.region().to_string()));

            let verifier = Arc::clone(&self.verifier);
            let cancel = cancel.clone();
            let active = gauge.enter();

            units.spawn(async move {
                let outcome = Self::run_unit(&verifier, &user, &cancel, start_delay).await;
                drop(active);
                drop(permit);
                (index, outcome)
            });
        }

        let mut outcomes: BTreeMap<Outcome, usize> = BTreeMap::new();
        let mut by_index: Vec<Option<Outcome>> = vec![None; dispatched];

        while let Some(joined) = units.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    *outcomes.entry(outcome).or_insert(0) += 1;
                    by_index[index] = Some(outcome);
                }
                Err(e) => {
                    error!("Drill worker failed to complete: {}", e);
                    *outcomes.entry(Outcome::Error).or_insert(0) += 1;
                }
            }
        }

        // Units that panicked never reported their index.
        let results = meta
            .into_iter()
            .zip(by_index)
            .enumerate()
            .map(|(index, ((email, region), outcome))| UserResult {
                index,
                email,
                region,
                outcome: outcome.unwrap_or(Outcome::Error),
            })
            .collect();

        let report = DrillReport {
            started_at,
            finished_at: Utc::now(),
            dispatched,
            peak_active: gauge.peak(),
            outcomes,
            results,
            stats: self.verifier.stats().snapshot(),
        };

        info!(
            "Push drill finished: {} users, {} confirmed, {} rejected, {} timed out, {} errors",
            report.dispatched,
            report.outcome_count(Outcome::Confirmed),
            report.outcome_count(Outcome::Rejected),
            report.outcome_count(Outcome::TimedOut),
            report.outcome_count(Outcome::Error)
        );

        Ok(report)
    }

    /// One admitted unit: optional start delay, then the verification.
    async fn run_unit(
        verifier: &PushVerifier,
        user: &UserRecord,
        cancel: &CancelSignal,
        start_delay: Duration,
    ) -> Outcome {
        if !start_delay.is_zero() && !cancel.is_cancelled() {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = verifier.timer().sleep(start_delay) => {}
            }
        }

        match verifier.verify(user, cancel).await {
            Ok(outcome) => {
                debug!("User {} finished with {}", user.email, outcome);
                outcome
            }
            Err(e) => {
                warn!("Push verification failed for {}: {}", user.email, e);
                Outcome::Error
            }
        }
    }
}
