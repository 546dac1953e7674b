//! `nodeops drain`: evict workloads from a worker node.

use anyhow::Result;
use clap::Args;
use console::style;

use super::{load_config, report_outcome, stdout_summary, ConnectArgs, OutputArgs};
use nodeops::remote::{Connector, SshTransport};
use nodeops::tasks::drain;

#[derive(Args)]
#[command(about = "Drain a worker node, running kubectl on the controller")]
pub struct DrainCommand {
    /// Kubernetes node name of the worker to drain
    pub worker: String,

    #[command(flatten)]
    pub connect: ConnectArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl DrainCommand {
    pub fn execute(&self) -> Result<()> {
        let config = load_config()?;
        let access = self.connect.access(&config)?;
        let connector = Connector::new(SshTransport::new());

        let outcome = drain::drain(&connector, &access, &self.worker)?;
        report_outcome(&outcome, access.target.host(), self.output, stdout_summary)?;

        if !self.output.json && outcome.last_stdout().is_some_and(str::is_empty) {
            eprintln!(
                "{} drain printed nothing, the command might have failed",
                style("WARNING:").yellow()
            );
        }
        Ok(())
    }
}
