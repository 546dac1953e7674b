//! Connecting to a host that comes up partway through the retry budget.

#![cfg(unix)]

use std::cell::Cell;
use std::time::Duration;

use nodeops::error::{Error, Result};
use nodeops::remote::{
    CancelToken, Clock, Connector, Credential, LocalSession, ManualClock, RetryPolicy, Target,
    Transport,
};
use nodeops::runner::Command;
use nodeops::tasks::{run_remote, RemoteAccess};

/// Refuses connections until the clock reaches `ready_at`, then hands out
/// local shell sessions.
struct BootingNode<'a> {
    clock: &'a ManualClock,
    ready_at: Duration,
    attempts: Cell<u32>,
}

impl<'a> BootingNode<'a> {
    fn new(clock: &'a ManualClock, ready_at: Duration) -> Self {
        Self {
            clock,
            ready_at,
            attempts: Cell::new(0),
        }
    }
}

impl Transport for &BootingNode<'_> {
    type Session = LocalSession;

    fn open_session(
        &self,
        _target: &Target,
        _credential: &Credential,
        _timeout: Duration,
    ) -> Result<LocalSession> {
        self.attempts.set(self.attempts.get() + 1);
        if self.clock.now() >= self.ready_at {
            Ok(LocalSession::new())
        } else {
            Err(Error::Transport("Connection refused".to_string()))
        }
    }
}

fn access(total: u64, interval: u64) -> RemoteAccess {
    RemoteAccess::new(
        Target::new("new-node", "ops"),
        Credential::new("pw"),
        RetryPolicy::new(Duration::from_secs(total), Duration::from_secs(interval)).unwrap(),
    )
}

#[test]
fn test_runs_once_node_is_up() {
    let clock = ManualClock::new();
    let node = BootingNode::new(&clock, Duration::from_secs(47));
    let connector = Connector::with_clock(&node, &clock);

    let outcome = run_remote(
        &connector,
        &access(180, 5),
        &[Command::new("echo ready")],
    )
    .unwrap();

    assert!(outcome.is_success());
    assert_eq!(outcome.last_stdout(), Some("ready"));
    assert_eq!(node.attempts.get(), 11);
    assert_eq!(clock.now(), Duration::from_secs(50));
}

#[test]
fn test_gives_up_when_budget_is_spent() {
    let clock = ManualClock::new();
    let node = BootingNode::new(&clock, Duration::from_secs(600));
    let connector = Connector::with_clock(&node, &clock);

    let err = run_remote(&connector, &access(30, 5), &[Command::new("true")]).unwrap_err();

    match err {
        Error::Connection(failure) => {
            assert_eq!(failure.attempts, 7);
            assert_eq!(failure.elapsed, Duration::from_secs(30));
            assert_eq!(failure.endpoint, "new-node:22");
            assert!(failure.to_string().contains("Connection refused"));
        }
        other => panic!("expected a connection failure, got {other}"),
    }
    assert_eq!(clock.sleeps().len(), 6);
}

#[test]
fn test_cancelled_wait_stops_early() {
    let clock = ManualClock::new();
    let node = BootingNode::new(&clock, Duration::from_secs(600));
    let token = CancelToken::new();
    token.cancel();
    let connector = Connector::with_clock(&node, &clock).with_cancel_token(token);

    let err = run_remote(&connector, &access(180, 5), &[Command::new("true")]).unwrap_err();

    assert!(matches!(err, Error::Connection(_)));
    assert_eq!(node.attempts.get(), 1);
    assert!(clock.sleeps().is_empty());
}
