//! Mock identity provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::provider::{
    Factor, IdentityProvider, PollReference, ProviderError, PushInitiation, PushStatus,
};

use super::fixtures;

/// Origin reported by the mock provider.
pub const MOCK_ORIGIN: &str = "https://mock.okta.test";

/// Per-user push behaviour.
#[derive(Debug)]
struct PushScript {
    initial_status: PushStatus,
    /// `None` means "use the default poll link".
    poll_href: Option<Option<String>>,
    polls: VecDeque<PushStatus>,
    /// Fail the n-th poll (1-based).
    poll_failure: Option<(usize, ProviderError)>,
}

impl Default for PushScript {
    fn default() -> Self {
        Self {
            initial_status: PushStatus::Waiting,
            poll_href: None,
            polls: VecDeque::new(),
            poll_failure: None,
        }
    }
}

/// Decrements the in-flight counter when a call finishes.
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Mock implementation of the IdentityProvider trait.
///
/// Provides controllable behavior for testing:
/// - Configure factors per user
/// - Script the sequence of poll statuses (WAITING once the script runs out)
/// - Simulate failures and latency
/// - Track calls and peak concurrency for assertions
#[derive(Debug, Default)]
pub struct MockIdentityProvider {
    factors: Arc<RwLock<HashMap<String, Vec<Factor>>>>,
    scripts: Arc<RwLock<HashMap<String, PushScript>>>,
    /// Poll reference -> user id, filled on initiation.
    poll_owners: Arc<RwLock<HashMap<String, String>>>,
    next_list_error: Arc<RwLock<Option<ProviderError>>>,
    latency: Arc<RwLock<Duration>>,

    list_calls: Arc<RwLock<Vec<String>>>,
    initiations: Arc<RwLock<Vec<(String, String)>>>,
    polls: Arc<RwLock<Vec<PollReference>>>,
    poll_counts: Arc<RwLock<HashMap<String, usize>>>,

    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the factors returned for a user.
    pub async fn set_factors(&self, user_id: &str, factors: Vec<Factor>) {
        self.factors
            .write()
            .await
            .insert(user_id.to_string(), factors);
    }

    /// Give a user a single push factor with id `push-<user_id>`.
    pub async fn enroll_push(&self, user_id: &str) {
        self.set_factors(
            user_id,
            vec![fixtures::factor(&format!("push-{}", user_id), "push")],
        )
        .await;
    }

    /// Statuses returned by successive polls for a user.
    pub async fn script_polls(&self, user_id: &str, statuses: Vec<PushStatus>) {
        self.scripts
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .polls = statuses.into();
    }

    /// Status returned by push initiation (default `Waiting`).
    pub async fn set_initial_status(&self, user_id: &str, status: PushStatus) {
        self.scripts
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .initial_status = status;
    }

    /// Override the poll link returned on initiation.
    pub async fn set_poll_href(&self, user_id: &str, href: Option<String>) {
        self.scripts
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .poll_href = Some(href);
    }

    /// Make the `nth` poll (1-based) for a user fail.
    pub async fn fail_poll(&self, user_id: &str, nth: usize, error: ProviderError) {
        self.scripts
            .write()
            .await
            .entry(user_id.to_string())
            .or_default()
            .poll_failure = Some((nth, error));
    }

    /// Make the next factor listing fail.
    pub async fn fail_next_list_factors(&self, error: ProviderError) {
        *self.next_list_error.write().await = Some(error);
    }

    /// Delay applied to every call.
    pub async fn set_latency(&self, latency: Duration) {
        *self.latency.write().await = latency;
    }

    pub async fn list_factors_count(&self) -> usize {
        self.list_calls.read().await.len()
    }

    pub async fn initiate_count(&self) -> usize {
        self.initiations.read().await.len()
    }

    /// `(user_id, factor_id)` of every initiation.
    pub async fn recorded_initiations(&self) -> Vec<(String, String)> {
        self.initiations.read().await.clone()
    }

    pub async fn recorded_polls(&self) -> Vec<PollReference> {
        self.polls.read().await.clone()
    }

    pub async fn poll_count(&self, user_id: &str) -> usize {
        self.poll_counts
            .read()
            .await
            .get(user_id)
            .copied()
            .unwrap_or(0)
    }

    pub async fn total_polls(&self) -> usize {
        self.polls.read().await.len()
    }

    /// Highest number of calls that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn enter(&self) -> InFlight<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let guard = InFlight(&self.in_flight);

        let latency = *self.latency.read().await;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        guard
    }

    fn default_poll_href(user_id: &str, factor_id: &str) -> String {
        format!(
            "{}/api/v1/users/{}/factors/{}/transactions/tx-{}",
            MOCK_ORIGIN, user_id, factor_id, user_id
        )
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    fn origin(&self) -> &str {
        MOCK_ORIGIN
    }

    async fn list_factors(&self, user_id: &str) -> Result<Vec<Factor>, ProviderError> {
        let _in_flight = self.enter().await;
        self.list_calls.write().await.push(user_id.to_string());

        if let Some(error) = self.next_list_error.write().await.take() {
            return Err(error);
        }

        Ok(self
            .factors
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn initiate_push(
        &self,
        user_id: &str,
        factor_id: &str,
    ) -> Result<PushInitiation, ProviderError> {
        let _in_flight = self.enter().await;
        self.initiations
            .write()
            .await
            .push((user_id.to_string(), factor_id.to_string()));

        let scripts = self.scripts.read().await;
        let script = scripts.get(user_id);
        let status = script
            .map(|s| s.initial_status.clone())
            .unwrap_or(PushStatus::Waiting);
        let poll_href = match script.and_then(|s| s.poll_href.clone()) {
            Some(custom) => custom,
            None => Some(Self::default_poll_href(user_id, factor_id)),
        };

        if let Some(href) = &poll_href {
            if let Ok(poll_ref) = PollReference::from_link(href, MOCK_ORIGIN) {
                self.poll_owners
                    .write()
                    .await
                    .insert(poll_ref.as_str().to_string(), user_id.to_string());
            }
        }

        Ok(PushInitiation { status, poll_href })
    }

    async fn poll_push_status(
        &self,
        poll_ref: &PollReference,
    ) -> Result<PushStatus, ProviderError> {
        let _in_flight = self.enter().await;
        self.polls.write().await.push(poll_ref.clone());

        let Some(user_id) = self.poll_owners.read().await.get(poll_ref.as_str()).cloned() else {
            return Err(ProviderError::ApiError {
                status: 404,
                message: format!("no transaction at {}", poll_ref),
            });
        };

        let nth = {
            let mut counts = self.poll_counts.write().await;
            let count = counts.entry(user_id.clone()).or_insert(0);
            *count += 1;
            *count
        };

        let mut scripts = self.scripts.write().await;
        let script = scripts.entry(user_id).or_default();
        if script
            .poll_failure
            .as_ref()
            .is_some_and(|(failing, _)| *failing == nth)
        {
            if let Some((_, error)) = script.poll_failure.take() {
                return Err(error);
            }
        }

        Ok(script.polls.pop_front().unwrap_or(PushStatus::Waiting))
    }
}
