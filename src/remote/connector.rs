//! Session establishment with a wall-clock retry budget.
//!
//! Used when waiting for a freshly provisioned node: authentication and
//! network failures are both treated as transient, since either can occur
//! while the node is still booting.

use crate::error::ConnectionFailure;
use crate::remote::clock::{Clock, SystemClock};
use crate::remote::diagnostics::diagnose_connection_failure;
use crate::remote::retry::{retry_until_deadline, CancelToken, RetryPolicy};
use crate::remote::transport::{Credential, Target, Transport};
use log::{info, warn};

/// Opens sessions through a [`Transport`], retrying per a [`RetryPolicy`].
pub struct Connector<T, C = SystemClock> {
    transport: T,
    clock: C,
    cancel: Option<CancelToken>,
}

impl<T: Transport> Connector<T, SystemClock> {
    pub fn new(transport: T) -> Self {
        Self::with_clock(transport, SystemClock::new())
    }
}

impl<T: Transport, C: Clock> Connector<T, C> {
    pub fn with_clock(transport: T, clock: C) -> Self {
        Self {
            transport,
            clock,
            cancel: None,
        }
    }

    /// Aborts the retry wait early once `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Opens a session to `target`, retrying until the policy's budget is spent.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionFailure`] wrapping the last attempt's error once
    /// the elapsed time reaches the total timeout, or when cancelled.
    pub fn connect(
        &self,
        target: &Target,
        credential: &Credential,
        policy: &RetryPolicy,
    ) -> Result<T::Session, ConnectionFailure> {
        info!(
            "Connecting to {} (budget {:?}, retry every {:?})",
            target,
            policy.total_timeout(),
            policy.retry_interval()
        );

        let result = retry_until_deadline(
            policy,
            &self.clock,
            self.cancel.as_ref(),
            |_| {
                self.transport
                    .open_session(target, credential, policy.attempt_timeout())
            },
            &format!("SSH connection to {}", target.endpoint()),
        );

        match result {
            Ok(session) => {
                info!("Connected to {}", target);
                Ok(session)
            }
            Err(exhausted) => {
                let failure = ConnectionFailure {
                    endpoint: target.endpoint(),
                    attempts: exhausted.attempts,
                    elapsed: exhausted.elapsed,
                    cause: Box::new(exhausted.last_error),
                };
                warn!("{}", diagnose_connection_failure(&failure, target));
                Err(failure)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::remote::clock::ManualClock;
    use crate::remote::transport::{RawOutput, RemoteSession};
    use std::cell::RefCell;
    use std::time::Duration;

    struct NullSession;

    impl RemoteSession for NullSession {
        fn execute(&mut self, _command: &str, _stdin: Option<&[u8]>) -> Result<RawOutput> {
            Ok(RawOutput {
                exit_status: 0,
                stdout: String::new(),
                stderr: String::new(),
            })
        }

        fn describe(&self) -> String {
            "null".to_string()
        }
    }

    /// Fails until `ready_at` on the shared clock, recording attempt times.
    struct BootingHost<'a> {
        clock: &'a ManualClock,
        ready_at: Option<Duration>,
        attempts: RefCell<Vec<Duration>>,
        seen_timeouts: RefCell<Vec<Duration>>,
    }

    impl Transport for &BootingHost<'_> {
        type Session = NullSession;

        fn open_session(
            &self,
            _target: &Target,
            _credential: &Credential,
            timeout: Duration,
        ) -> Result<NullSession> {
            let now = self.clock.now();
            self.attempts.borrow_mut().push(now);
            self.seen_timeouts.borrow_mut().push(timeout);
            match self.ready_at {
                Some(t) if now >= t => Ok(NullSession),
                _ if self.attempts.borrow().len() % 2 == 0 => {
                    Err(Error::Authentication("sshd not accepting logins yet".into()))
                }
                _ => Err(Error::Transport("Connection refused".into())),
            }
        }
    }

    fn host(clock: &ManualClock, ready_at: Option<Duration>) -> BootingHost<'_> {
        BootingHost {
            clock,
            ready_at,
            attempts: RefCell::new(Vec::new()),
            seen_timeouts: RefCell::new(Vec::new()),
        }
    }

    #[test]
    fn test_connects_once_host_is_ready() {
        let clock = ManualClock::new();
        let booting = host(&clock, Some(Duration::from_secs(47)));
        let connector = Connector::with_clock(&booting, &clock);
        let policy = RetryPolicy::new(Duration::from_secs(180), Duration::from_secs(5)).unwrap();

        let session = connector.connect(&Target::new("w1", "ops"), &Credential::new("pw"), &policy);

        assert!(session.is_ok());
        let attempts = booting.attempts.borrow();
        assert_eq!(attempts.len(), 11);
        assert_eq!(attempts[9], Duration::from_secs(45));
        assert_eq!(*attempts.last().unwrap(), Duration::from_secs(50));
    }

    #[test]
    fn test_auth_and_network_errors_both_retried() {
        let clock = ManualClock::new();
        let booting = host(&clock, Some(Duration::from_secs(10)));
        let connector = Connector::with_clock(&booting, &clock);
        let policy = RetryPolicy::new(Duration::from_secs(60), Duration::from_secs(5)).unwrap();

        assert!(connector
            .connect(&Target::new("w1", "ops"), &Credential::new("pw"), &policy)
            .is_ok());
        // 0s refused, 5s auth rejected, 10s connected.
        assert_eq!(booting.attempts.borrow().len(), 3);
    }

    #[test]
    fn test_failure_after_budget() {
        let clock = ManualClock::new();
        let booting = host(&clock, None);
        let connector = Connector::with_clock(&booting, &clock);
        let policy = RetryPolicy::new(Duration::from_secs(30), Duration::from_secs(5))
            .unwrap()
            .with_attempt_timeout(Duration::from_secs(3));

        let target = Target::new("w1", "ops");
        let failure = match connector.connect(&target, &Credential::new("pw"), &policy) {
            Err(f) => f,
            Ok(_) => panic!("expected connection failure"),
        };

        assert_eq!(failure.endpoint, "w1:22");
        assert!(failure.attempts >= 6);
        assert!(failure.elapsed >= Duration::from_secs(30));
        assert!(booting
            .seen_timeouts
            .borrow()
            .iter()
            .all(|t| *t == Duration::from_secs(3)));
    }

    #[test]
    fn test_cancel_token_stops_waiting() {
        let clock = ManualClock::new();
        let booting = host(&clock, None);
        let token = CancelToken::new();
        token.cancel();
        let connector = Connector::with_clock(&booting, &clock).with_cancel_token(token);
        let policy = RetryPolicy::new(Duration::from_secs(180), Duration::from_secs(5)).unwrap();

        let target = Target::new("w1", "ops");
        let failure = match connector.connect(&target, &Credential::new("pw"), &policy) {
            Err(f) => f,
            Ok(_) => panic!("expected cancellation"),
        };

        assert_eq!(failure.attempts, 1);
        assert!(matches!(*failure.cause, Error::Cancelled));
        assert!(clock.sleeps().is_empty());
    }
}
