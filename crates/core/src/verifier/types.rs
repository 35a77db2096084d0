//! Types for push verification.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::ProviderError;

/// Terminal result of one user's verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    NoFactor,
    Confirmed,
    Rejected,
    TimedOut,
    Canceled,
    Error,
}

impl Outcome {
    pub const ALL: [Outcome; 6] = [
        Outcome::NoFactor,
        Outcome::Confirmed,
        Outcome::Rejected,
        Outcome::TimedOut,
        Outcome::Canceled,
        Outcome::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::NoFactor => "NO_FACTOR",
            Outcome::Confirmed => "CONFIRMED",
            Outcome::Rejected => "REJECTED",
            Outcome::TimedOut => "TIMED_OUT",
            Outcome::Canceled => "CANCELED",
            Outcome::Error => "ERROR",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons a verification ends in [`Outcome::Error`].
#[derive(Debug, Error)]
pub enum VerifyError {
    /// Listing the user's factors failed.
    #[error("list factors failed: {0}")]
    ListFactors(#[source] ProviderError),

    /// Sending the push failed.
    #[error("push initiation failed: {0}")]
    Initiate(#[source] ProviderError),

    /// The push did not start out waiting for the user.
    #[error("expected WAITING status for push, got {0:?}")]
    UnexpectedStatus(String),

    /// No usable poll link came back with the push.
    #[error("cannot poll push: {0}")]
    PollLink(#[source] ProviderError),

    /// A status poll failed.
    #[error("push status poll failed: {0}")]
    Poll(#[source] ProviderError),

    /// The provider answered with a status this drill does not know.
    #[error("unknown status code {0:?}")]
    UnknownStatus(String),
}
