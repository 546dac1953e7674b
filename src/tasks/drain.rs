//! Drain a worker node from the controller.

use crate::error::Result;
use crate::remote::clock::Clock;
use crate::remote::connector::Connector;
use crate::remote::shell;
use crate::remote::transport::Transport;
use crate::runner::{Command, RunOutcome};
use crate::tasks::{run_remote, validate_node_name, RemoteAccess};

/// Builds the drain command for `worker`.
pub fn commands(worker: &str) -> Result<Vec<Command>> {
    validate_node_name(worker)?;
    let text = format!(
        "kubectl drain {} --ignore-daemonsets --delete-emptydir-data --force",
        shell::quote(worker)
    );
    Ok(vec![Command::elevated(text).labeled(format!("Draining {}", worker))])
}

/// Evicts all pods from `worker` and cordons it.
pub fn drain<T: Transport, C: Clock>(
    connector: &Connector<T, C>,
    access: &RemoteAccess,
    worker: &str,
) -> Result<RunOutcome> {
    let commands = commands(worker)?;
    run_remote(connector, access, &commands)
}
