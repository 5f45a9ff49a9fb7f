//! Polling a resource's lifecycle state until it settles.
//!
//! [`StateChangeConf`] is a bounded poll parameterized by pending and target
//! state sets. Each poll calls a [`StateRefresh`] source; the first refresh
//! happens immediately and the interval then doubles up to a ceiling.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, trace};

use crate::error::ProviderError;

/// Something whose lifecycle state can be fetched.
///
/// `Ok(None)` means the resource was not found.
#[async_trait::async_trait]
pub trait StateRefresh: Send {
    /// Fetch the current lifecycle state.
    async fn refresh(&mut self) -> Result<Option<String>, ProviderError>;
}

/// Adapts a closure into a [`StateRefresh`].
pub struct RefreshFn<F>(pub F);

#[async_trait::async_trait]
impl<F, Fut> StateRefresh for RefreshFn<F>
where
    F: FnMut() -> Fut + Send,
    Fut: Future<Output = Result<Option<String>, ProviderError>> + Send,
{
    async fn refresh(&mut self) -> Result<Option<String>, ProviderError> {
        (self.0)().await
    }
}

/// Poll intervals used by every wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Delay after the first refresh.
    pub poll_interval: Duration,
    /// Ceiling for the doubling delay.
    pub max_poll_interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            max_poll_interval: Duration::from_secs(10),
        }
    }
}

/// Configuration for waiting on a lifecycle state transition.
#[derive(Debug, Clone)]
pub struct StateChangeConf {
    /// States that mean "still working".
    pub pending: Vec<String>,
    /// States that end the wait successfully.
    pub target: Vec<String>,
    /// Total time allowed.
    pub timeout: Duration,
    /// Initial delay between refreshes.
    pub poll_interval: Duration,
    /// Maximum delay between refreshes.
    pub max_poll_interval: Duration,
    /// A missing resource counts as reaching the target (deletes).
    pub not_found_is_target: bool,
    /// Consecutive not-found refreshes tolerated before giving up.
    pub not_found_checks: u32,
}

impl StateChangeConf {
    /// Wait from `pending` to `target` within `timeout`.
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        let poll = PollSettings::default();
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            poll_interval: poll.poll_interval,
            max_poll_interval: poll.max_poll_interval,
            not_found_is_target: false,
            not_found_checks: 20,
        }
    }

    /// Use the given poll intervals.
    pub fn with_poll_settings(mut self, poll: PollSettings) -> Self {
        self.poll_interval = poll.poll_interval;
        self.max_poll_interval = poll.max_poll_interval;
        self
    }

    /// Treat a missing resource as success.
    pub fn with_not_found_as_target(mut self) -> Self {
        self.not_found_is_target = true;
        self
    }

    /// Poll until the state is a target.
    ///
    /// Returns the final state, or `None` when the resource disappeared and
    /// that was allowed. Refresh errors end the wait and are returned
    /// unchanged, except not-found errors when `not_found_is_target`.
    pub async fn wait_for_state<S>(&self, source: &mut S) -> Result<Option<String>, ProviderError>
    where
        S: StateRefresh + ?Sized,
    {
        let deadline = Instant::now() + self.timeout;
        let mut interval = self.poll_interval;
        let mut last_state = String::new();
        let mut not_found = 0u32;

        loop {
            match source.refresh().await {
                Ok(Some(state)) => {
                    not_found = 0;
                    trace!(state = %state, "Refreshed lifecycle state");
                    if self.target.contains(&state) {
                        debug!(state = %state, "Reached target state");
                        return Ok(Some(state));
                    }
                    if !self.pending.contains(&state) {
                        return Err(ProviderError::UnexpectedState {
                            state,
                            expected: self.target.join(", "),
                        });
                    }
                    last_state = state;
                },
                Ok(None) => {
                    if self.not_found_is_target {
                        return Ok(None);
                    }
                    not_found += 1;
                    if not_found > self.not_found_checks {
                        return Err(ProviderError::NotFound(format!(
                            "couldn't find resource ({} retries)",
                            self.not_found_checks
                        )));
                    }
                },
                Err(e) if e.is_not_found() && self.not_found_is_target => return Ok(None),
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(self.timeout_error(&last_state));
            }
            sleep(interval.min(deadline - now)).await;
            interval = (interval * 2).min(self.max_poll_interval);
            if Instant::now() >= deadline {
                return Err(self.timeout_error(&last_state));
            }
        }
    }

    fn timeout_error(&self, last_state: &str) -> ProviderError {
        ProviderError::DeadlineExceeded(format!(
            "timeout while waiting for state to become '{}' (last state: '{}', timeout: {:?})",
            self.target.join(", "),
            last_state,
            self.timeout
        ))
    }
}

/// Poll `fetch` until `keep_waiting` returns false for its response.
///
/// Used for preconditions outside a resource's own lifecycle, such as waiting
/// for a database's first backup to become ACTIVE.
pub async fn wait_till_condition<T, F, Fut, P>(
    mut fetch: F,
    mut keep_waiting: P,
    timeout: Duration,
    interval: Duration,
) -> Result<T, ProviderError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
    P: FnMut(&T) -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        let response = fetch().await?;
        if !keep_waiting(&response) {
            return Ok(response);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(ProviderError::DeadlineExceeded(format!(
                "condition not met within {:?}",
                timeout
            )));
        }
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of refresh results, repeating the last one.
    struct Script(VecDeque<Result<Option<String>, ProviderError>>, u32);

    impl Script {
        fn states(states: &[Option<&str>]) -> Self {
            Self(
                states
                    .iter()
                    .map(|s| Ok(s.map(str::to_string)))
                    .collect(),
                0,
            )
        }
    }

    #[async_trait::async_trait]
    impl StateRefresh for Script {
        async fn refresh(&mut self) -> Result<Option<String>, ProviderError> {
            self.1 += 1;
            if self.0.len() > 1 {
                return self.0.pop_front().unwrap_or(Ok(None));
            }
            match self.0.front() {
                Some(Ok(state)) => Ok(state.clone()),
                Some(Err(_)) => self.0.pop_front().unwrap_or(Ok(None)),
                None => Ok(None),
            }
        }
    }

    fn fast(conf: StateChangeConf) -> StateChangeConf {
        conf.with_poll_settings(PollSettings {
            poll_interval: Duration::from_millis(1),
            max_poll_interval: Duration::from_millis(4),
        })
    }

    #[tokio::test]
    async fn test_reaches_target() {
        let conf = fast(StateChangeConf::new(
            &["PROVISIONING"],
            &["AVAILABLE"],
            Duration::from_secs(5),
        ));
        let mut script = Script::states(&[
            Some("PROVISIONING"),
            Some("PROVISIONING"),
            Some("AVAILABLE"),
        ]);
        let state = conf.wait_for_state(&mut script).await.unwrap();
        assert_eq!(state.as_deref(), Some("AVAILABLE"));
        assert_eq!(script.1, 3);
    }

    #[tokio::test]
    async fn test_unexpected_state_is_fatal() {
        let conf = fast(StateChangeConf::new(
            &["PROVISIONING"],
            &["AVAILABLE"],
            Duration::from_secs(5),
        ));
        let mut script = Script::states(&[Some("PROVISIONING"), Some("FAILED")]);
        match conf.wait_for_state(&mut script).await {
            Err(ProviderError::UnexpectedState { state, expected }) => {
                assert_eq!(state, "FAILED");
                assert_eq!(expected, "AVAILABLE");
            },
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_timeout_names_last_state() {
        let conf = fast(StateChangeConf::new(
            &["UPDATING"],
            &["AVAILABLE"],
            Duration::from_millis(30),
        ));
        let mut script = Script::states(&[Some("UPDATING")]);
        match conf.wait_for_state(&mut script).await {
            Err(ProviderError::DeadlineExceeded(msg)) => {
                assert!(msg.contains("'AVAILABLE'"));
                assert!(msg.contains("last state: 'UPDATING'"));
            },
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(script.1 > 1);
    }

    #[tokio::test]
    async fn test_not_found_as_target() {
        let conf = fast(
            StateChangeConf::new(&["TERMINATING"], &["TERMINATED"], Duration::from_secs(5))
                .with_not_found_as_target(),
        );
        let mut script = Script::states(&[Some("TERMINATING"), None]);
        assert_eq!(conf.wait_for_state(&mut script).await.unwrap(), None);

        let mut script = Script(
            VecDeque::from(vec![
                Ok(Some("TERMINATING".to_string())),
                Err(ServiceError::new("GetDbSystem", 404, "NotAuthorizedOrNotFound", "gone").into()),
            ]),
            0,
        );
        assert_eq!(conf.wait_for_state(&mut script).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_not_found_keeps_polling_until_checks_exhausted() {
        let mut conf = fast(StateChangeConf::new(
            &["CREATING"],
            &["ACTIVE"],
            Duration::from_secs(5),
        ));
        let mut script = Script::states(&[None, None, Some("ACTIVE")]);
        assert_eq!(
            conf.wait_for_state(&mut script).await.unwrap().as_deref(),
            Some("ACTIVE")
        );

        conf.not_found_checks = 2;
        let mut script = Script::states(&[None]);
        let err = conf.wait_for_state(&mut script).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(script.1, 3);
    }

    #[tokio::test]
    async fn test_refresh_error_is_returned_unchanged() {
        let conf = fast(StateChangeConf::new(
            &["PROVISIONING"],
            &["AVAILABLE"],
            Duration::from_secs(5),
        ));
        let mut script = Script(
            VecDeque::from(vec![Err(ServiceError::new(
                "GetDbSystem",
                401,
                "NotAuthenticated",
                "bad signature",
            )
            .into())]),
            0,
        );
        match conf.wait_for_state(&mut script).await {
            Err(ProviderError::Service(err)) => assert_eq!(err.code, "NotAuthenticated"),
            other => panic!("unexpected result: {:?}", other),
        }

        // A not-found error is fatal when not-found is not a target.
        let mut script = Script(
            VecDeque::from(vec![Err(ServiceError::new(
                "GetDbSystem",
                404,
                "NotAuthorizedOrNotFound",
                "gone",
            )
            .into())]),
            0,
        );
        assert!(conf.wait_for_state(&mut script).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_refresh_fn_adapter() {
        let mut polls = 0;
        let mut source = RefreshFn(move || {
            polls += 1;
            let state = if polls < 3 { "CREATING" } else { "ACTIVE" };
            async move { Ok::<_, ProviderError>(Some(state.to_string())) }
        });
        let conf = fast(StateChangeConf::new(
            &["CREATING"],
            &["ACTIVE"],
            Duration::from_secs(5),
        ));
        assert_eq!(
            conf.wait_for_state(&mut source).await.unwrap().as_deref(),
            Some("ACTIVE")
        );
    }

    #[tokio::test]
    async fn test_wait_till_condition() {
        let mut calls = 0;
        let backups = wait_till_condition(
            || {
                calls += 1;
                let n = calls;
                async move { Ok::<_, ProviderError>(if n < 3 { vec![] } else { vec!["ACTIVE"] }) }
            },
            |backups: &Vec<&str>| backups.is_empty(),
            Duration::from_secs(5),
            Duration::from_millis(1),
        )
        .await
        .unwrap();
        assert_eq!(backups, vec!["ACTIVE"]);

        let err = wait_till_condition(
            || async { Ok::<_, ProviderError>(0) },
            |_| true,
            Duration::from_millis(10),
            Duration::from_millis(2),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ProviderError::DeadlineExceeded(_)));
    }
}
