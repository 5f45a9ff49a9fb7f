//! Retry policy applied to every SDK call.
//!
//! Whether a failed call is retried depends on its HTTP status, the service
//! error code and how long the operation has been retrying:
//!
//! | status | retried |
//! |---|---|
//! | 400, 401, 403, 412 | never |
//! | 404 | unless not-found retries are disabled, for [`SHORT_RETRY_TIME`] |
//! | 409 | only `IncorrectState`, for the long window |
//! | 429, 5xx, no response | for the long window |
//!
//! Waits between attempts grow as `2^(attempt-1)` seconds, capped at
//! [`MAX_BACKOFF`], plus up to one second of jitter.

use std::future::Future;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, warn};

use crate::error::ProviderError;

/// Window for retrying 404s, which are usually eventual-consistency lag.
pub const SHORT_RETRY_TIME: Duration = Duration::from_secs(2 * 60);

/// Default window for conflicts, throttling and server errors.
pub const LONG_RETRY_TIME: Duration = Duration::from_secs(10 * 60);

/// Upper bound of the exponential backoff, before jitter.
pub const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Provider-wide retry knobs from the provider block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrySettings {
    /// `disable_auto_retries`: every call is attempted exactly once.
    pub disable_auto_retries: bool,
    /// `retry_duration_seconds`: replaces [`LONG_RETRY_TIME`].
    pub long_retry_time: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            disable_auto_retries: false,
            long_retry_time: LONG_RETRY_TIME,
        }
    }
}

impl RetrySettings {
    /// Build the policy for one request.
    pub fn policy(&self, disable_not_found_retries: bool, service: &str) -> RetryPolicy {
        RetryPolicy {
            disable_not_found_retries,
            service: service.to_string(),
            short_retry_time: SHORT_RETRY_TIME.min(self.long_retry_time),
            long_retry_time: self.long_retry_time,
            max_attempts: self.disable_auto_retries.then_some(1),
        }
    }
}

/// The retry policy carried in a request's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Never retry a 404.
    pub disable_not_found_retries: bool,
    /// Service the request targets, e.g. `database`, `dns`, `identity`.
    pub service: String,
    /// Retry window for 404s.
    pub short_retry_time: Duration,
    /// Retry window for everything else that is retryable.
    pub long_retry_time: Duration,
    /// Hard cap on attempts. `None` means the time windows decide.
    pub max_attempts: Option<u32>,
}

/// Build the default retry policy for a request.
///
/// `disable_not_found_retries` is set by reads that expect the resource may
/// be gone, so a 404 is reported at once.
pub fn retry_policy(disable_not_found_retries: bool, service: &str) -> RetryPolicy {
    RetrySettings::default().policy(disable_not_found_retries, service)
}

/// What happened on one attempt of an operation.
#[derive(Debug, Clone, Copy)]
pub struct OperationOutcome<'a> {
    /// The error, or `None` if the call succeeded.
    pub error: Option<&'a ProviderError>,
    /// 1-based attempt number.
    pub attempt: u32,
    /// Time since the first attempt started.
    pub elapsed: Duration,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retry(service: &str) -> Self {
        Self {
            disable_not_found_retries: true,
            service: service.to_string(),
            short_retry_time: Duration::ZERO,
            long_retry_time: Duration::ZERO,
            max_attempts: Some(1),
        }
    }

    /// Whether the operation should be attempted again.
    pub fn should_retry(&self, outcome: &OperationOutcome<'_>) -> bool {
        let Some(err) = outcome.error else {
            return false;
        };
        if self
            .max_attempts
            .is_some_and(|max| outcome.attempt >= max)
        {
            return false;
        }

        let within_long = outcome.elapsed < self.long_retry_time;
        match err.status_code() {
            Some(400 | 401 | 403 | 412) => false,
            Some(404) => !self.disable_not_found_retries && outcome.elapsed < self.short_retry_time,
            Some(409) => self.is_retryable_conflict(err) && within_long,
            Some(429) | Some(500..=599) => within_long,
            Some(_) => false,
            // No response at all: connection reset, DNS failure, timeout.
            None => matches!(err, ProviderError::Http(_)) && within_long,
        }
    }

    fn is_retryable_conflict(&self, err: &ProviderError) -> bool {
        let ProviderError::Service(service_err) = err else {
            return false;
        };
        service_err.code == "IncorrectState"
            || (self.service == "identity"
                && service_err.code == "NotAuthorizedOrResourceAlreadyExists")
    }

    /// Backoff before attempt `attempt + 1`, without jitter.
    pub fn backoff(attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(6);
        Duration::from_secs(1u64 << exponent).min(MAX_BACKOFF)
    }

    /// Backoff plus up to one second of random jitter.
    pub fn next_duration(&self, attempt: u32) -> Duration {
        let jitter = rand::thread_rng().gen_range(0..1000);
        Self::backoff(attempt) + Duration::from_millis(jitter)
    }
}

/// Run `operation` until it succeeds or `policy` says to stop.
///
/// The last error is returned unchanged.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let start = Instant::now();
    let mut attempt = 1;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let outcome = OperationOutcome {
            error: Some(&err),
            attempt,
            elapsed: start.elapsed(),
        };
        if !policy.should_retry(&outcome) {
            debug!(operation = operation_name, attempt, "Not retrying");
            return Err(err);
        }
        let wait = policy.next_duration(attempt);
        warn!(
            operation = operation_name,
            attempt,
            status = ?err.status_code(),
            wait = ?wait,
            "Retrying request"
        );
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use rstest::rstest;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn service_error(status: u16, code: &str) -> ProviderError {
        ServiceError::new("GetDbSystem", status, code, "message").into()
    }

    fn outcome(err: &ProviderError, elapsed_secs: u64) -> OperationOutcome<'_> {
        OperationOutcome {
            error: Some(err),
            attempt: 1,
            elapsed: Duration::from_secs(elapsed_secs),
        }
    }

    #[rstest]
    #[case(400, "InvalidParameter")]
    #[case(401, "NotAuthenticated")]
    #[case(403, "NotAuthorized")]
    #[case(412, "NoEtagMatch")]
    fn test_client_errors_never_retried(#[case] status: u16, #[case] code: &str) {
        let policy = retry_policy(false, "database");
        let err = service_error(status, code);
        assert!(!policy.should_retry(&outcome(&err, 0)));
    }

    #[test]
    fn test_success_is_never_retried() {
        let policy = retry_policy(false, "database");
        let ok = OperationOutcome {
            error: None,
            attempt: 1,
            elapsed: Duration::ZERO,
        };
        assert!(!policy.should_retry(&ok));
    }

    #[test]
    fn test_not_found_uses_short_window() {
        let err = service_error(404, "NotAuthorizedOrNotFound");

        let policy = retry_policy(false, "database");
        assert!(policy.should_retry(&outcome(&err, 0)));
        assert!(policy.should_retry(&outcome(&err, 119)));
        assert!(!policy.should_retry(&outcome(&err, 120)));

        let policy = retry_policy(true, "database");
        assert!(!policy.should_retry(&outcome(&err, 0)));
    }

    #[test]
    fn test_conflict_only_for_incorrect_state() {
        let policy = retry_policy(false, "database");
        let incorrect = service_error(409, "IncorrectState");
        assert!(policy.should_retry(&outcome(&incorrect, 0)));
        assert!(policy.should_retry(&outcome(&incorrect, 599)));
        assert!(!policy.should_retry(&outcome(&incorrect, 600)));

        let exists = service_error(409, "NotAuthorizedOrResourceAlreadyExists");
        assert!(!policy.should_retry(&outcome(&exists, 0)));

        let identity = retry_policy(false, "identity");
        assert!(identity.should_retry(&outcome(&exists, 0)));
    }

    #[rstest]
    #[case(429)]
    #[case(500)]
    #[case(502)]
    #[case(503)]
    fn test_throttling_and_server_errors_use_long_window(#[case] status: u16) {
        let policy = retry_policy(true, "dns");
        let err = service_error(status, "TooManyRequests");
        assert!(policy.should_retry(&outcome(&err, 300)));
        assert!(!policy.should_retry(&outcome(&err, 601)));
    }

    #[test]
    fn test_local_errors_are_not_retried() {
        let policy = retry_policy(false, "database");
        let err = ProviderError::Validation("bad".to_string());
        assert!(!policy.should_retry(&outcome(&err, 0)));
    }

    #[test]
    fn test_disable_auto_retries_is_single_shot() {
        let settings = RetrySettings {
            disable_auto_retries: true,
            ..Default::default()
        };
        let policy = settings.policy(false, "database");
        let err = service_error(503, "ServiceUnavailable");
        assert!(!policy.should_retry(&outcome(&err, 0)));
    }

    #[test]
    fn test_retry_duration_override() {
        let settings = RetrySettings {
            disable_auto_retries: false,
            long_retry_time: Duration::from_secs(30),
        };
        let policy = settings.policy(false, "database");
        let err = service_error(500, "InternalError");
        assert!(policy.should_retry(&outcome(&err, 29)));
        assert!(!policy.should_retry(&outcome(&err, 31)));

        let not_found = service_error(404, "NotAuthorizedOrNotFound");
        assert!(!policy.should_retry(&outcome(&not_found, 31)));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        assert_eq!(RetryPolicy::backoff(1), Duration::from_secs(1));
        assert_eq!(RetryPolicy::backoff(2), Duration::from_secs(2));
        assert_eq!(RetryPolicy::backoff(3), Duration::from_secs(4));
        assert_eq!(RetryPolicy::backoff(6), Duration::from_secs(32));
        assert_eq!(RetryPolicy::backoff(7), MAX_BACKOFF);
        assert_eq!(RetryPolicy::backoff(40), MAX_BACKOFF);
    }

    #[test]
    fn test_next_duration_adds_bounded_jitter() {
        let policy = retry_policy(false, "database");
        for attempt in 1..5 {
            let wait = policy.next_duration(attempt);
            let base = RetryPolicy::backoff(attempt);
            assert!(wait >= base);
            assert!(wait < base + Duration::from_secs(1));
        }
    }

    #[tokio::test]
    async fn test_call_with_retry_returns_last_error_unchanged() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::no_retry("database");
        let result: Result<(), _> = call_with_retry(&policy, "GetDbSystem", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(service_error(500, "InternalError")) }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result {
            Err(ProviderError::Service(err)) => assert_eq!(err.code, "InternalError"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_call_with_retry_retries_then_succeeds() {
        let calls = AtomicU32::new(0);
        let policy = retry_policy(false, "database");
        let result = call_with_retry(&policy, "GetDbSystem", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(service_error(409, "IncorrectState"))
                } else {
                    Ok("AVAILABLE")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "AVAILABLE");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
