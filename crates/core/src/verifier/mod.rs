//! Per-user push verification.
//!
//! [`PushVerifier`] drives one user from factor lookup through push initiation
//! and polling until a terminal [`Outcome`]:
//! - **Start**: count the user, list factors
//! - **FactorSearch**: first push factor wins
//! - **Initiate**: send the push, expect `WAITING`, derive the poll reference
//! - **Poll / Wait**: poll at a fixed interval until the provider decides,
//!   the optional client deadline passes, or the run is canceled

mod cancel;
mod machine;
mod timer;
mod types;

pub use cancel::{cancel_pair, CancelHandle, CancelSignal};
pub use machine::{PushVerifier, VerifierSettings};
pub use timer::{PollTimer, TokioTimer};
pub use types::{Outcome, VerifyError};
