//! Push verification state machine.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::DrillConfig;
use crate::directory::UserRecord;
use crate::provider::{IdentityProvider, PollReference, PushChallenge, PushStatus};
use crate::stats::{StatLabel, StatsAggregator};

use super::cancel::CancelSignal;
use super::timer::PollTimer;
use super::types::{Outcome, VerifyError};

/// Timing knobs of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Wait between two polls.
    pub poll_interval: Duration,
    /// Client-side ceiling on polling; `None` waits for the provider's verdict.
    pub poll_deadline: Option<Duration>,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        VerifierSettings::from(&DrillConfig::default())
    }
}

impl From<&DrillConfig> for VerifierSettings {
    fn from(config: &DrillConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            poll_deadline: config.poll_deadline(),
        }
    }
}

/// Drives a single user's push from factor lookup to a terminal outcome.
pub struct PushVerifier {
    provider: Arc<dyn IdentityProvider>,
    stats: Arc<StatsAggregator>,
    timer: Arc<dyn PollTimer>,
    settings: VerifierSettings,
}

impl PushVerifier {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        stats: Arc<StatsAggregator>,
        timer: Arc<dyn PollTimer>,
        settings: VerifierSettings,
    ) -> Self {
        Self {
            provider,
            stats,
            timer,
            settings,
        }
    }

    pub fn stats(&self) -> &Arc<StatsAggregator> {
        &self.stats
    }

    pub fn timer(&self) -> &Arc<dyn PollTimer> {
        &self.timer
    }

    /// Run the verification for one user.
    ///
    /// `Err` means [`Outcome::Error`]; every other outcome is `Ok`, including
    /// rejections and timeouts.
    pub async fn verify(
        &self,
        user: &UserRecord,
        cancel: &CancelSignal,
    ) -> Result<Outcome, VerifyError> {
        let region = user.region();
        if user.region.is_none() {
            debug!("Country code not set for user {}", user.email);
        }
        self.stats.increment(region, StatLabel::TotalUsers);

        if cancel.is_cancelled() {
            info!("Drill canceled before contacting user {}", user.email);
            return Ok(Outcome::Canceled);
        }

        let factors = self
            .provider
            .list_factors(&user.provider_id)
            .await
            .map_err(VerifyError::ListFactors)?;

        if factors.is_empty() {
            info!("No MFA factors found [{}] for user {}", region, user.email);
            return Ok(Outcome::NoFactor);
        }

        let Some(factor) = factors.iter().find(|f| f.is_push()) else {
            info!(
                "No push-type MFA factor found [{}] for user {} ({} other factors)",
                region,
                user.email,
                factors.len()
            );
            return Ok(Outcome::NoFactor);
        };

        info!("Found push factor [{}] for user {}", region, user.email);
        self.stats.increment(region, StatLabel::PushEnrolled);

        // No push may be sent once the drill is canceled.
        if cancel.is_cancelled() {
            info!("Drill canceled, not sending push to user {}", user.email);
            return Ok(Outcome::Canceled);
        }

        let initiation = self
            .provider
            .initiate_push(&user.provider_id, &factor.id)
            .await
            .map_err(VerifyError::Initiate)?;

        if initiation.status != PushStatus::Waiting {
            return Err(VerifyError::UnexpectedStatus(initiation.status.to_string()));
        }

        let href = initiation.poll_href.unwrap_or_default();
        let poll_ref = PollReference::from_link(&href, self.provider.origin())
            .map_err(VerifyError::PollLink)?;
        let challenge = PushChallenge::new(poll_ref, self.timer.now());

        self.poll_until_terminal(user, &challenge, cancel).await
    }

    async fn poll_until_terminal(
        &self,
        user: &UserRecord,
        challenge: &PushChallenge,
        cancel: &CancelSignal,
    ) -> Result<Outcome, VerifyError> {
        let region = user.region();
        let mut polls: u32 = 0;

        loop {
            let status = self
                .provider
                .poll_push_status(&challenge.poll_ref)
                .await
                .map_err(VerifyError::Poll)?;
            polls += 1;

            match status {
                PushStatus::Waiting => {
                    debug!("Push for {} still waiting after {} polls", user.email, polls);
                }
                PushStatus::Success => {
                    info!("{} confirmed push", user.email);
                    self.stats.increment(region, StatLabel::ConfirmedPush);
                    return Ok(Outcome::Confirmed);
                }
                PushStatus::Rejected => {
                    warn!("{} rejected push", user.email);
                    self.stats.increment(region, StatLabel::RejectedPush);
                    return Ok(Outcome::Rejected);
                }
                PushStatus::Timeout => {
                    let elapsed = challenge.elapsed(self.timer.now());
                    info!("Push for {} timed out after {:?}", user.email, elapsed);
                    self.stats.increment(region, StatLabel::TimeoutPush);
                    return Ok(Outcome::TimedOut);
                }
                PushStatus::Other(code) => return Err(VerifyError::UnknownStatus(code)),
            }

            if let Some(deadline) = self.settings.poll_deadline {
                let elapsed = challenge.elapsed(self.timer.now());
                if elapsed >= deadline {
                    info!(
                        "Push for {} hit client deadline after {:?} ({} polls)",
                        user.email, elapsed, polls
                    );
                    self.stats.increment(region, StatLabel::TimeoutPush);
                    return Ok(Outcome::TimedOut);
                }
            }

            if cancel.is_cancelled() {
                info!("Push verification for {} canceled", user.email);
                return Ok(Outcome::Canceled);
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Push verification for {} canceled", user.email);
                    return Ok(Outcome::Canceled);
                }
                _ = self.timer.sleep(self.settings.poll_interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ProviderError;
    use crate::testing::{fixtures, ManualTimer, MockIdentityProvider};
    use crate::verifier::cancel_pair;

    struct Harness {
        provider: Arc<MockIdentityProvider>,
        stats: Arc<StatsAggregator>,
        timer: Arc<ManualTimer>,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                provider: Arc::new(MockIdentityProvider::new()),
                stats: Arc::new(StatsAggregator::new()),
                timer: Arc::new(ManualTimer::new()),
            }
        }

        fn verifier(&self, settings: VerifierSettings) -> PushVerifier {
            PushVerifier::new(
                self.provider.clone(),
                Arc::clone(&self.stats),
                self.timer.clone(),
                settings,
            )
        }
    }

    fn settings() -> VerifierSettings {
        VerifierSettings {
            poll_interval: Duration::from_secs(3),
            poll_deadline: None,
        }
    }

    fn jane() -> UserRecord {
        fixtures::user_record("u1", "jane@example.com", Some("DE"))
    }

    #[tokio::test]
    async fn test_no_factors() {
        let h = Harness::new();
        let outcome = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoFactor);
        assert_eq!(h.stats.count("DE", StatLabel::TotalUsers), 1);
        assert_eq!(h.stats.count("DE", StatLabel::PushEnrolled), 0);
        assert_eq!(h.provider.initiate_count().await, 0);
    }

    #[tokio::test]
    async fn test_only_non_push_factors() {
        let h = Harness::new();
        h.provider
            .set_factors(
                "u1",
                vec![
                    fixtures::factor("sms1", "sms"),
                    fixtures::factor("tot1", "token:software:totp"),
                ],
            )
            .await;

        let outcome = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::NoFactor);
        assert_eq!(h.stats.count("DE", StatLabel::PushEnrolled), 0);
        assert_eq!(h.provider.initiate_count().await, 0);
    }

    #[tokio::test]
    async fn test_confirmed_on_first_poll() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider.script_polls("u1", vec![PushStatus::Success]).await;

        let outcome = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Confirmed);
        assert_eq!(h.stats.count("DE", StatLabel::TotalUsers), 1);
        assert_eq!(h.stats.count("DE", StatLabel::PushEnrolled), 1);
        assert_eq!(h.stats.count("DE", StatLabel::ConfirmedPush), 1);
        assert_eq!(h.provider.poll_count("u1").await, 1);
        assert!(h.timer.recorded_sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_first_push_factor_wins() {
        let h = Harness::new();
        h.provider
            .set_factors(
                "u1",
                vec![
                    fixtures::factor("sms1", "sms"),
                    fixtures::factor("push1", "push"),
                    fixtures::factor("push2", "push"),
                ],
            )
            .await;
        h.provider.script_polls("u1", vec![PushStatus::Success]).await;

        h.verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        let initiations = h.provider.recorded_initiations().await;
        assert_eq!(initiations, vec![("u1".to_string(), "push1".to_string())]);
        assert_eq!(h.stats.count("DE", StatLabel::PushEnrolled), 1);
    }

    #[tokio::test]
    async fn test_rejected_after_waiting() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider
            .script_polls(
                "u1",
                vec![PushStatus::Waiting, PushStatus::Waiting, PushStatus::Rejected],
            )
            .await;

        let outcome = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(h.stats.count("DE", StatLabel::RejectedPush), 1);
        assert_eq!(h.provider.poll_count("u1").await, 3);
        assert_eq!(
            h.timer.recorded_sleeps(),
            vec![Duration::from_secs(3), Duration::from_secs(3)]
        );
    }

    #[tokio::test]
    async fn test_provider_timeout_reports_duration() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider
            .script_polls("u1", vec![PushStatus::Waiting, PushStatus::Timeout])
            .await;

        let outcome = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(h.stats.count("DE", StatLabel::TimeoutPush), 1);
        assert_eq!(h.timer.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_unknown_status_is_error() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider
            .script_polls("u1", vec![PushStatus::Other("CHALLENGE".to_string())])
            .await;

        let err = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, VerifyError::UnknownStatus(ref code) if code == "CHALLENGE"));
        assert_eq!(h.stats.count("DE", StatLabel::ConfirmedPush), 0);
    }

    #[tokio::test]
    async fn test_non_waiting_initiation_never_polls() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider.set_initial_status("u1", PushStatus::Rejected).await;

        let err = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, VerifyError::UnexpectedStatus(ref s) if s == "REJECTED"));
        assert_eq!(h.provider.poll_count("u1").await, 0);
        assert_eq!(h.stats.count("DE", StatLabel::PushEnrolled), 1);
    }

    #[tokio::test]
    async fn test_missing_poll_link_is_error() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider.set_poll_href("u1", None).await;

        let err = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, VerifyError::PollLink(_)));
        assert_eq!(h.provider.poll_count("u1").await, 0);
    }

    #[tokio::test]
    async fn test_list_factors_error() {
        let h = Harness::new();
        h.provider
            .fail_next_list_factors(ProviderError::Unauthorized("expired token".to_string()))
            .await;

        let err = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, VerifyError::ListFactors(ProviderError::Unauthorized(_))));
        assert_eq!(h.stats.count("DE", StatLabel::TotalUsers), 1);
    }

    #[tokio::test]
    async fn test_poll_error_aborts_loop() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider
            .script_polls("u1", vec![PushStatus::Waiting, PushStatus::Success])
            .await;
        h.provider
            .fail_poll("u1", 2, ProviderError::ParseError("bad json".to_string()))
            .await;

        let err = h
            .verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap_err();

        assert!(matches!(err, VerifyError::Poll(ProviderError::ParseError(_))));
        assert_eq!(h.provider.poll_count("u1").await, 2);
        assert_eq!(h.stats.count("DE", StatLabel::ConfirmedPush), 0);
    }

    #[tokio::test]
    async fn test_poll_uses_relative_reference() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        h.provider
            .script_polls("u1", vec![PushStatus::Waiting, PushStatus::Success])
            .await;

        h.verifier(settings())
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        let polls = h.provider.recorded_polls().await;
        assert_eq!(polls.len(), 2);
        assert!(polls
            .iter()
            .all(|p| p.as_str() == "/api/v1/users/u1/factors/push-u1/transactions/tx-u1"));
    }

    #[tokio::test]
    async fn test_already_canceled_sends_no_push() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;
        let (handle, signal) = cancel_pair();
        handle.cancel();

        let outcome = h.verifier(settings()).verify(&jane(), &signal).await.unwrap();

        assert_eq!(outcome, Outcome::Canceled);
        assert_eq!(h.stats.count("DE", StatLabel::TotalUsers), 1);
        assert_eq!(h.stats.count("DE", StatLabel::PushEnrolled), 0);
        assert_eq!(h.provider.list_factors_count().await, 0);
        assert_eq!(h.provider.initiate_count().await, 0);
        assert_eq!(h.provider.poll_count("u1").await, 0);
        assert!(h.timer.recorded_sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_cancel_while_listing_factors_sends_no_push() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.enroll_push("u1").await;
        provider.set_latency(Duration::from_millis(200)).await;
        let stats = Arc::new(StatsAggregator::new());
        let verifier = PushVerifier::new(
            provider.clone(),
            Arc::clone(&stats),
            Arc::new(crate::verifier::TokioTimer),
            settings(),
        );
        let (handle, signal) = cancel_pair();

        let task = tokio::spawn(async move { verifier.verify(&jane(), &signal).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let outcome = task.await.unwrap().unwrap();

        assert_eq!(outcome, Outcome::Canceled);
        assert_eq!(provider.list_factors_count().await, 1);
        assert_eq!(stats.count("DE", StatLabel::PushEnrolled), 1);
        assert_eq!(provider.initiate_count().await, 0);
        assert_eq!(provider.poll_count("u1").await, 0);
    }

    #[tokio::test]
    async fn test_cancel_during_wait_skips_next_poll() {
        let provider = Arc::new(MockIdentityProvider::new());
        provider.enroll_push("u1").await;
        let stats = Arc::new(StatsAggregator::new());
        let verifier = PushVerifier::new(
            provider.clone(),
            Arc::clone(&stats),
            Arc::new(crate::verifier::TokioTimer),
            VerifierSettings {
                poll_interval: Duration::from_secs(30),
                poll_deadline: None,
            },
        );
        let (handle, signal) = cancel_pair();

        let task = tokio::spawn(async move { verifier.verify(&jane(), &signal).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(5), task)
            .await
            .expect("verifier should stop promptly")
            .unwrap()
            .unwrap();

        assert_eq!(outcome, Outcome::Canceled);
        assert_eq!(provider.poll_count("u1").await, 1);
        assert_eq!(stats.count("DE", StatLabel::TimeoutPush), 0);
    }

    #[tokio::test]
    async fn test_client_deadline() {
        let h = Harness::new();
        h.provider.enroll_push("u1").await;

        let outcome = h
            .verifier(VerifierSettings {
                poll_interval: Duration::from_secs(3),
                poll_deadline: Some(Duration::from_secs(10)),
            })
            .verify(&jane(), &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::TimedOut);
        assert_eq!(h.stats.count("DE", StatLabel::TimeoutPush), 1);
        // Polls at t=0, 3, 6, 9, 12; the deadline is checked after each WAITING.
        assert_eq!(h.provider.poll_count("u1").await, 5);
        assert_eq!(h.timer.elapsed(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_same_script_same_result() {
        for _ in 0..3 {
            let h = Harness::new();
            h.provider.enroll_push("u1").await;
            h.provider
                .script_polls("u1", vec![PushStatus::Waiting, PushStatus::Success])
                .await;

            let outcome = h
                .verifier(settings())
                .verify(&jane(), &CancelSignal::never())
                .await
                .unwrap();

            assert_eq!(outcome, Outcome::Confirmed);
            let table = h.stats.snapshot();
            assert_eq!(table.len(), 3);
            assert_eq!(table.get("DE Total Users"), 1);
            assert_eq!(table.get("DE PUSH ENROLLED"), 1);
            assert_eq!(table.get("DE CONFIRMED PUSH"), 1);
        }
    }

    #[tokio::test]
    async fn test_unknown_region_bucket() {
        let h = Harness::new();
        let user = fixtures::user_record("u2", "joe@example.com", None);

        h.verifier(settings())
            .verify(&user, &CancelSignal::never())
            .await
            .unwrap();

        assert_eq!(h.stats.count("UNKNOWN", StatLabel::TotalUsers), 1);
    }
}
