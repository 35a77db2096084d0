//! Identity provider abstraction.
//!
//! This module provides an `IdentityProvider` trait for the three calls a push
//! drill needs (list factors, initiate a push, poll its status), with an
//! Okta implementation.

mod okta;
mod types;

pub use okta::OktaProvider;
pub(crate) use okta::{build_http_client, ensure_success};
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Token rejected by the provider.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Poll link missing or unusable.
    #[error("Invalid poll link: {0}")]
    InvalidPollLink(String),
}

/// Capabilities of an identity provider used by the push verifier.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Origin the provider serves its API from, without trailing slash.
    fn origin(&self) -> &str;

    /// List the MFA factors enrolled for a user, in provider order.
    async fn list_factors(&self, user_id: &str) -> Result<Vec<Factor>, ProviderError>;

    /// Send a push challenge for the given factor.
    async fn initiate_push(
        &self,
        user_id: &str,
        factor_id: &str,
    ) -> Result<PushInitiation, ProviderError>;

    /// Fetch the current status of an in-flight push.
    async fn poll_push_status(&self, poll_ref: &PollReference)
        -> Result<PushStatus, ProviderError>;
}
