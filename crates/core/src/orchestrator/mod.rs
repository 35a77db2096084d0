//! Drill orchestrator.
//!
//! Fans the selected users out to [`PushVerifier`](crate::verifier::PushVerifier)
//! runs with bounded parallelism:
//! - **Admission**: a semaphore with `max_concurrent` permits, acquired in input order
//! - **Units**: one spawned task per user, releasing its permit when done
//! - **Barrier**: `run` returns once every unit has joined and been tallied

mod runner;
mod types;

pub use runner::DrillOrchestrator;
pub use types::{DrillReport, OrchestratorError, UserResult};
