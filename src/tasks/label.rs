//! Give a worker node the worker role label.

use crate::error::Result;
use crate::remote::clock::Clock;
use crate::remote::connector::Connector;
use crate::remote::shell;
use crate::remote::transport::Transport;
use crate::runner::{Command, RunOutcome};
use crate::tasks::{run_remote, validate_node_name, RemoteAccess};
use log::info;

pub const DEFAULT_ROLE: &str = "worker";

/// What labeling a node amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelPlan {
    /// The node is the controller itself; nothing to do.
    Skip,
    Run(Vec<Command>),
}

/// Plans labeling `worker` with `role` from `controller`.
pub fn plan(controller: &str, worker: &str, role: &str) -> Result<LabelPlan> {
    if controller.eq_ignore_ascii_case(worker) {
        return Ok(LabelPlan::Skip);
    }
    validate_node_name(worker)?;
    validate_node_name(role)?;

    let label = format!("node-role.kubernetes.io/{role}={role}");
    let text = format!(
        "kubectl label node {} {}",
        shell::quote(worker),
        shell::quote(&label)
    );
    let command = Command::elevated(text).labeled(format!("Labeling {} as {}", worker, role));
    Ok(LabelPlan::Run(vec![command]))
}

/// Labels `worker`, or returns `Ok(None)` when it is the controller.
pub fn label<T: Transport, C: Clock>(
    connector: &Connector<T, C>,
    access: &RemoteAccess,
    worker: &str,
    role: &str,
) -> Result<Option<RunOutcome>> {
    match plan(access.target.host(), worker, role)? {
        LabelPlan::Skip => {
            info!("{} is the controller node, no action needed", worker);
            Ok(None)
        }
        LabelPlan::Run(commands) => run_remote(connector, access, &commands).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::clock::ManualClock;
    use crate::remote::retry::RetryPolicy;
    use crate::remote::transport::{Credential, Target};
    use crate::tasks::testing::FakeTransport;
    use std::time::Duration;

    fn access(host: &str) -> RemoteAccess {
        RemoteAccess::new(
            Target::new(host, "ops"),
            Credential::new("pw"),
            RetryPolicy::new(Duration::from_secs(5), Duration::from_secs(5)).unwrap(),
        )
    }

    #[test]
    fn test_plan_for_worker() {
        let plan = plan("cp-01", "worker-03", DEFAULT_ROLE).unwrap();
        match plan {
            LabelPlan::Run(cmds) => assert_eq!(
                cmds[0].text,
                "kubectl label node worker-03 node-role.kubernetes.io/worker=worker"
            ),
            LabelPlan::Skip => panic!("worker should be labeled"),
        }
    }

    #[test]
    fn test_controller_is_skipped() {
        assert_eq!(plan("cp-01", "CP-01", DEFAULT_ROLE).unwrap(), LabelPlan::Skip);
    }

    #[test]
    fn test_skip_opens_no_session() {
        let transport = FakeTransport::unreachable();
        let clock = ManualClock::new();
        let connector = Connector::with_clock(&transport, &clock);

        let result = label(&connector, &access("cp-01"), "cp-01", DEFAULT_ROLE).unwrap();

        assert!(result.is_none());
        assert_eq!(clock.now(), Duration::ZERO);
    }

    #[test]
    fn test_label_runs_command() {
        let transport = FakeTransport::new().respond(0, "node/worker-03 labeled\n", "");
        let clock = ManualClock::new();
        let connector = Connector::with_clock(&transport, &clock);

        let outcome = label(&connector, &access("cp-01"), "worker-03", DEFAULT_ROLE)
            .unwrap()
            .unwrap();

        assert!(outcome.is_success());
        assert_eq!(transport.executed().len(), 1);
    }
}
