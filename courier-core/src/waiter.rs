//! Waiter - Poll a remote object until it reaches a target status
//!
//! Remote APIs often acknowledge a request before the object is usable.
//! `StatusWaiter` re-reads the object until its status lands in `target`,
//! treating `pending` statuses as "keep waiting" and anything else as failure.

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::time::Instant;

use crate::provider::ProviderError;

/// Error returned when waiting for a status fails
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error("timeout while waiting for status to become '{}' (last status: '{}', timeout: {:?})", target.join(", "), last_status.as_deref().unwrap_or("none"), timeout)]
    Timeout {
        target: Vec<String>,
        last_status: Option<String>,
        timeout: Duration,
    },

    #[error("unexpected status '{status}', wanted target '{}'", target.join(", "))]
    UnexpectedStatus { status: String, target: Vec<String> },

    #[error("couldn't find resource ({checks} retries)")]
    NotFound { checks: u32 },

    #[error(transparent)]
    Refresh(#[from] ProviderError),
}

impl From<WaitError> for ProviderError {
    fn from(err: WaitError) -> Self {
        match err {
            WaitError::Refresh(inner) => inner,
            other => ProviderError::new(other.to_string()).with_cause(other),
        }
    }
}

/// Polls a refresh function until the reported status reaches a target
#[derive(Debug, Clone)]
pub struct StatusWaiter {
    /// Statuses that mean "still working on it"
    pub pending: Vec<String>,
    /// Statuses that end the wait successfully
    pub target: Vec<String>,
    /// Upper bound on the whole wait
    pub timeout: Duration,
    /// Wait before the first refresh
    pub delay: Duration,
    /// First interval between refreshes; doubles after each pending status
    pub min_interval: Duration,
    /// Cap for the interval between refreshes
    pub max_interval: Duration,
    /// Consecutive "not found" refreshes tolerated before giving up
    pub not_found_checks: u32,
}

impl StatusWaiter {
    pub fn new(pending: &[&str], target: &[&str], timeout: Duration) -> Self {
        Self {
            pending: pending.iter().map(|s| s.to_string()).collect(),
            target: target.iter().map(|s| s.to_string()).collect(),
            timeout,
            delay: Duration::ZERO,
            min_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            not_found_checks: 20,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_intervals(mut self, min: Duration, max: Duration) -> Self {
        self.min_interval = min;
        self.max_interval = max.max(min);
        self
    }

    pub fn with_not_found_checks(mut self, checks: u32) -> Self {
        self.not_found_checks = checks;
        self
    }

    /// Poll `refresh` until it reports a target status.
    ///
    /// `refresh` returns `Ok(None)` while the object is not visible yet,
    /// and `Ok(Some((value, status)))` once it is.
    pub async fn wait<T, F, Fut>(&self, mut refresh: F) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<(T, String)>, ProviderError>>,
    {
        // A timeout too large to represent as an Instant means no deadline
        let deadline = Instant::now().checked_add(self.timeout);
        let mut last_status: Option<String> = None;
        let mut not_found = 0;
        let mut interval = self.min_interval;

        if !self.delay.is_zero() {
            if passes_deadline(deadline, self.delay) {
                return Err(self.timed_out(last_status));
            }
            tokio::time::sleep(self.delay).await;
        }

        loop {
            let refreshed = match deadline {
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    match tokio::time::timeout(remaining, refresh()).await {
                        Ok(result) => result?,
                        Err(_) => return Err(self.timed_out(last_status)),
                    }
                }
                None => refresh().await?,
            };

            match refreshed {
                Some((value, status)) => {
                    not_found = 0;
                    debug!("waiter: status '{}'", status);

                    if self.target.contains(&status) {
                        info!("waiter: reached target status '{}'", status);
                        return Ok(value);
                    }
                    if !self.pending.contains(&status) {
                        warn!("waiter: unexpected status '{}'", status);
                        return Err(WaitError::UnexpectedStatus {
                            status,
                            target: self.target.clone(),
                        });
                    }
                    last_status = Some(status);
                }
                None => {
                    not_found += 1;
                    debug!("waiter: resource not found ({} of {})", not_found, self.not_found_checks);
                    if not_found > self.not_found_checks {
                        warn!("waiter: resource still missing after {} checks", not_found);
                        return Err(WaitError::NotFound { checks: not_found });
                    }
                }
            }

            if passes_deadline(deadline, interval) {
                return Err(self.timed_out(last_status));
            }
            tokio::time::sleep(interval).await;
            interval = interval.saturating_mul(2).min(self.max_interval);
        }
    }

    fn timed_out(&self, last_status: Option<String>) -> WaitError {
        warn!(
            "waiter: timed out after {:?} (last status: {:?})",
            self.timeout, last_status
        );
        WaitError::Timeout {
            target: self.target.clone(),
            last_status,
            timeout: self.timeout,
        }
    }
}

/// Whether sleeping `wait` from now would reach `deadline`
fn passes_deadline(deadline: Option<Instant>, wait: Duration) -> bool {
    match (deadline, Instant::now().checked_add(wait)) {
        (Some(deadline), Some(wake)) => wake >= deadline,
        (Some(_), None) => true,
        (None, _) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    fn fast(waiter: StatusWaiter) -> StatusWaiter {
        waiter.with_intervals(Duration::from_millis(1), Duration::from_millis(4))
    }

    /// Refresh function that replays a scripted sequence of results
    fn scripted(
        steps: Vec<Option<&'static str>>,
    ) -> (
        Arc<Mutex<usize>>,
        impl FnMut() -> std::future::Ready<Result<Option<(u32, String)>, ProviderError>>,
    ) {
        let calls = Arc::new(Mutex::new(0));
        let counter = calls.clone();
        let mut steps: VecDeque<_> = steps.into();
        let refresh = move || {
            *counter.lock().unwrap() += 1;
            let step = steps.pop_front().unwrap_or(Some("IN_PROGRESS"));
            std::future::ready(Ok(step.map(|s| (7, s.to_string()))))
        };
        (calls, refresh)
    }

    #[tokio::test]
    async fn returns_value_when_target_reached() {
        let waiter = fast(StatusWaiter::new(
            &["IN_PROGRESS"],
            &["ENABLED"],
            Duration::from_secs(5),
        ));
        let (calls, refresh) = scripted(vec![
            Some("IN_PROGRESS"),
            Some("IN_PROGRESS"),
            Some("ENABLED"),
        ]);

        let value = waiter.wait(refresh).await.unwrap();
        assert_eq!(value, 7);
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn unexpected_status_fails_immediately() {
        let waiter = fast(StatusWaiter::new(
            &["IN_PROGRESS"],
            &["ENABLED"],
            Duration::from_secs(5),
        ));
        let (calls, refresh) = scripted(vec![Some("IN_PROGRESS"), Some("ERROR")]);

        let err = waiter.wait(refresh).await.unwrap_err();
        match err {
            WaitError::UnexpectedStatus { status, target } => {
                assert_eq!(status, "ERROR");
                assert_eq!(target, vec!["ENABLED".to_string()]);
            }
            other => panic!("expected UnexpectedStatus, got {:?}", other),
        }
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn times_out_with_last_status() {
        let waiter = fast(StatusWaiter::new(
            &["IN_PROGRESS"],
            &["ENABLED"],
            Duration::from_millis(30),
        ));
        let (_calls, refresh) = scripted(vec![]);

        let err = waiter.wait(refresh).await.unwrap_err();
        match err {
            WaitError::Timeout { last_status, .. } => {
                assert_eq!(last_status.as_deref(), Some("IN_PROGRESS"));
            }
            other => panic!("expected Timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn gives_up_after_not_found_checks() {
        let waiter = fast(
            StatusWaiter::new(&["IN_PROGRESS"], &["ENABLED"], Duration::from_secs(5))
                .with_not_found_checks(2),
        );
        let (calls, refresh) = scripted(vec![None, None, None, Some("ENABLED")]);

        let err = waiter.wait(refresh).await.unwrap_err();
        assert!(matches!(err, WaitError::NotFound { checks: 3 }));
        assert_eq!(*calls.lock().unwrap(), 3);
    }

    #[tokio::test]
    async fn not_found_counter_resets_once_visible() {
        let waiter = fast(
            StatusWaiter::new(&["IN_PROGRESS"], &["ENABLED"], Duration::from_secs(5))
                .with_not_found_checks(1),
        );
        let (_calls, refresh) = scripted(vec![
            None,
            Some("IN_PROGRESS"),
            None,
            Some("ENABLED"),
        ]);

        assert_eq!(waiter.wait(refresh).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn refresh_error_is_propagated() {
        let waiter = fast(StatusWaiter::new(
            &["IN_PROGRESS"],
            &["ENABLED"],
            Duration::from_secs(5),
        ));
        let refresh = || async {
            Err::<Option<(u32, String)>, _>(ProviderError::new("throttled"))
        };

        let err = waiter.wait(refresh).await.unwrap_err();
        let provider_err: ProviderError = err.into();
        assert_eq!(provider_err.message, "throttled");
    }

    #[test]
    fn wait_error_converts_into_provider_error() {
        let err = WaitError::UnexpectedStatus {
            status: "DISABLED".to_string(),
            target: vec!["ENABLED".to_string()],
        };
        let provider_err: ProviderError = err.into();
        assert_eq!(
            provider_err.message,
            "unexpected status 'DISABLED', wanted target 'ENABLED'"
        );
        assert!(provider_err.cause.is_some());
    }

    #[test]
    fn max_interval_never_below_min() {
        let waiter = StatusWaiter::new(&[], &["ENABLED"], Duration::from_secs(1))
            .with_intervals(Duration::from_secs(5), Duration::from_secs(1));
        assert_eq!(waiter.max_interval, Duration::from_secs(5));
    }

    /// Refresh function that records when it is called
    fn timed(
        steps: Vec<&'static str>,
    ) -> (
        Arc<Mutex<Vec<Instant>>>,
        impl FnMut() -> std::future::Ready<Result<Option<(u32, String)>, ProviderError>>,
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let recorded = calls.clone();
        let mut steps: VecDeque<_> = steps.into();
        let refresh = move || {
            recorded.lock().unwrap().push(Instant::now());
            let status = steps.pop_front().unwrap_or("IN_PROGRESS");
            std::future::ready(Ok(Some((7, status.to_string()))))
        };
        (calls, refresh)
    }

    #[tokio::test(start_paused = true)]
    async fn intervals_double_up_to_max() {
        let waiter = StatusWaiter::new(&["IN_PROGRESS"], &["ENABLED"], Duration::from_secs(60))
            .with_intervals(Duration::from_secs(1), Duration::from_secs(4));
        let (calls, refresh) = timed(vec![
            "IN_PROGRESS",
            "IN_PROGRESS",
            "IN_PROGRESS",
            "IN_PROGRESS",
            "IN_PROGRESS",
            "ENABLED",
        ]);

        assert_eq!(waiter.wait(refresh).await.unwrap(), 7);

        let calls = calls.lock().unwrap();
        let gaps: Vec<u64> = calls
            .windows(2)
            .map(|pair| (pair[1] - pair[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![1, 2, 4, 4, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn delay_precedes_first_poll() {
        let waiter = StatusWaiter::new(&["IN_PROGRESS"], &["ENABLED"], Duration::from_secs(60))
            .with_delay(Duration::from_secs(5));
        let (calls, refresh) = timed(vec!["ENABLED"]);
        let start = Instant::now();

        waiter.wait(refresh).await.unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0] - start, Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn delay_reaching_deadline_times_out_without_polling() {
        let waiter = StatusWaiter::new(&["IN_PROGRESS"], &["ENABLED"], Duration::from_secs(10))
            .with_delay(Duration::from_secs(10));
        let (calls, refresh) = timed(vec!["ENABLED"]);

        let err = waiter.wait(refresh).await.unwrap_err();

        assert!(matches!(err, WaitError::Timeout { last_status: None, .. }));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unrepresentable_timeout_means_no_deadline() {
        for timeout in [Duration::from_secs(i64::MAX as u64), Duration::MAX] {
            let waiter = fast(StatusWaiter::new(&["IN_PROGRESS"], &["ENABLED"], timeout))
                .with_delay(Duration::from_millis(1));
            let (calls, refresh) = scripted(vec![Some("IN_PROGRESS"), Some("ENABLED")]);

            assert_eq!(waiter.wait(refresh).await.unwrap(), 7);
            assert_eq!(*calls.lock().unwrap(), 2);
        }
    }
}
