//! Deadline-bounded retry for session establishment.
//!
//! Connection attempts are repeated at a fixed interval until a wall-clock
//! budget runs out. The clock is injected so the loop can be driven in tests
//! without real sleeps.

use crate::error::{Error, Result};
use crate::remote::clock::Clock;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-attempt timeout used when none is configured.
const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

/// Budget for retrying an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    total_timeout: Duration,
    retry_interval: Duration,
    attempt_timeout: Duration,
}

impl RetryPolicy {
    /// Creates a policy, rejecting budgets that cannot be honored.
    ///
    /// # Errors
    ///
    /// `total_timeout` must be non-zero and `retry_interval` must lie in
    /// `(0, total_timeout]`.
    pub fn new(total_timeout: Duration, retry_interval: Duration) -> Result<Self> {
        if total_timeout.is_zero() {
            return Err(Error::InvalidInput(
                "total timeout must be greater than zero".to_string(),
            ));
        }
        if retry_interval.is_zero() || retry_interval > total_timeout {
            return Err(Error::InvalidInput(format!(
                "retry interval {:?} must be greater than zero and at most the total timeout {:?}",
                retry_interval, total_timeout
            )));
        }

        Ok(Self {
            total_timeout,
            retry_interval,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        })
    }

    /// Sets the timeout handed to the transport for each single attempt.
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn total_timeout(&self) -> Duration {
        self.total_timeout
    }

    pub fn retry_interval(&self) -> Duration {
        self.retry_interval
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }
}

/// Cooperative cancellation flag, checked before each retry wait.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// All attempts failed (or the wait was cancelled).
#[derive(Debug)]
pub struct RetryExhausted {
    pub attempts: u32,
    pub elapsed: Duration,
    pub last_error: Error,
}

/// Runs `operation` until it succeeds or the policy's budget is spent.
///
/// The first attempt happens immediately. After each failure the elapsed
/// time since the first attempt is compared with the total timeout: once it
/// is reached the last error is returned, otherwise the loop sleeps for the
/// retry interval and tries again. An attempt always follows a sleep, even
/// when the budget ran out during that sleep.
///
/// `operation` receives the 1-based attempt number.
pub fn retry_until_deadline<T, F, C>(
    policy: &RetryPolicy,
    clock: &C,
    cancel: Option<&CancelToken>,
    mut operation: F,
    operation_name: &str,
) -> std::result::Result<T, RetryExhausted>
where
    F: FnMut(u32) -> Result<T>,
    C: Clock + ?Sized,
{
    let start = clock.now();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let err = match operation(attempt) {
            Ok(value) => {
                debug!("{} succeeded on attempt {}", operation_name, attempt);
                return Ok(value);
            }
            Err(e) => e,
        };

        let elapsed = clock.now().saturating_sub(start);
        debug!(
            "{} failed on attempt {} after {:?}: {}",
            operation_name, attempt, elapsed, err
        );

        if elapsed >= policy.total_timeout {
            return Err(RetryExhausted {
                attempts: attempt,
                elapsed,
                last_error: err,
            });
        }

        if cancel.is_some_and(CancelToken::is_cancelled) {
            warn!("{} cancelled after {} attempt(s): {}", operation_name, attempt, err);
            return Err(RetryExhausted {
                attempts: attempt,
                elapsed,
                last_error: Error::Cancelled,
            });
        }

        warn!(
            "{} not ready ({}); retrying in {:?} ({:?} of {:?} used)",
            operation_name, err, policy.retry_interval, elapsed, policy.total_timeout
        );
        clock.sleep(policy.retry_interval);
    }
}
