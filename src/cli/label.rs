//! `nodeops label`: mark a node with the worker role.

use anyhow::Result;
use clap::Args;

use super::{load_config, report_outcome, stdout_summary, ConnectArgs, OutputArgs};
use nodeops::remote::{Connector, SshTransport};
use nodeops::tasks::label;

#[derive(Args)]
#[command(about = "Label a worker node with its role, running kubectl on the controller")]
pub struct LabelCommand {
    /// Kubernetes node name of the worker
    pub worker: String,

    /// Role name used for node-role.kubernetes.io/<role>=<role>
    #[arg(long, default_value = label::DEFAULT_ROLE)]
    pub role: String,

    #[command(flatten)]
    pub connect: ConnectArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl LabelCommand {
    pub fn execute(&self) -> Result<()> {
        let config = load_config()?;
        let access = self.connect.access(&config)?;
        let connector = Connector::new(SshTransport::new());

        match label::label(&connector, &access, &self.worker, &self.role)? {
            Some(outcome) => {
                report_outcome(&outcome, access.target.host(), self.output, stdout_summary)
            }
            None => {
                println!("{} is the Kubernetes controller node, no action needed.", self.worker);
                Ok(())
            }
        }
    }
}
