//! Fetch a `kubeadm join` command from a control-plane node.
//!
//! The controller may still be provisioning when this runs, so callers
//! normally pass the full wait budget in the access policy.

use crate::error::Result;
use crate::remote::clock::Clock;
use crate::remote::connector::Connector;
use crate::remote::transport::Transport;
use crate::runner::{Command, RunOutcome};
use crate::tasks::{run_remote, RemoteAccess};

pub const TOKEN_CREATE: &str = "kubeadm token create --print-join-command";

pub fn commands() -> Vec<Command> {
    vec![Command::elevated(TOKEN_CREATE).labeled("Creating join token")]
}

/// Creates a bootstrap token on the controller and returns the run.
pub fn fetch<T: Transport, C: Clock>(
    connector: &Connector<T, C>,
    access: &RemoteAccess,
) -> Result<RunOutcome> {
    run_remote(connector, access, &commands())
}

/// The join command printed by a successful run, if it printed one.
pub fn join_command(outcome: &RunOutcome) -> Option<&str> {
    if !outcome.is_success() {
        return None;
    }
    outcome.last_stdout().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::clock::ManualClock;
    use crate::remote::retry::RetryPolicy;
    use crate::remote::transport::{Credential, Target};
    use crate::tasks::testing::FakeTransport;
    use std::time::Duration;

    fn access() -> RemoteAccess {
        RemoteAccess::new(
            Target::new("cp-01", "ops"),
            Credential::new("pw"),
            RetryPolicy::new(Duration::from_secs(180), Duration::from_secs(5)).unwrap(),
        )
    }

    const JOIN: &str =
        "kubeadm join 10.0.0.10:6443 --token abc.def --discovery-token-ca-cert-hash sha256:00";

    #[test]
    fn test_fetch_join_command() {
        let stdout = format!("{}\n", JOIN);
        let transport = FakeTransport::new().respond(0, &stdout, "[sudo] password for ops: ");
        let clock = ManualClock::new();
        let connector = Connector::with_clock(&transport, &clock);

        let outcome = fetch(&connector, &access()).unwrap();

        assert_eq!(join_command(&outcome), Some(JOIN));
        let executed = transport.executed();
        assert_eq!(executed.len(), 1);
        assert!(executed[0].contains("kubeadm token create --print-join-command"));
        assert!(executed[0].starts_with("sudo -S"));
        assert_eq!(
            transport.log.borrow()[0].1.as_deref(),
            Some(&b"pw\n"[..])
        );
    }

    #[test]
    fn test_empty_output_yields_no_join_command() {
        let transport = FakeTransport::new().respond(0, "\n", "");
        let clock = ManualClock::new();
        let connector = Connector::with_clock(&transport, &clock);

        let outcome = fetch(&connector, &access()).unwrap();

        assert!(outcome.is_success());
        assert_eq!(join_command(&outcome), None);
    }

    #[test]
    fn test_failed_run_yields_no_join_command() {
        let transport = FakeTransport::new().respond(
            1,
            "partial",
            "error: timed out waiting for the condition",
        );
        let clock = ManualClock::new();
        let connector = Connector::with_clock(&transport, &clock);

        let outcome = fetch(&connector, &access()).unwrap();

        assert_eq!(outcome.failed_at, Some(0));
        assert_eq!(join_command(&outcome), None);
    }
}
