//! `nodeops exec`: run an ad-hoc command list on a target.

use anyhow::{bail, Result};
use clap::Args;

use super::{load_config, report_outcome, stdout_summary, ConnectArgs, OutputArgs};
use nodeops::remote::{Connector, SshTransport};
use nodeops::runner::Command;
use nodeops::tasks::run_remote;

#[derive(Args)]
#[command(about = "Run commands in order on a target, stopping at the first failure")]
pub struct ExecCommand {
    /// Command to run; repeat for a sequence
    #[arg(long = "cmd", required = true)]
    pub commands: Vec<String>,

    /// Run every command through sudo
    #[arg(long)]
    pub sudo: bool,

    #[command(flatten)]
    pub connect: ConnectArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl ExecCommand {
    fn plan(&self) -> Result<Vec<Command>> {
        if self.commands.iter().any(|c| c.trim().is_empty()) {
            bail!("commands must not be empty");
        }
        Ok(self
            .commands
            .iter()
            .map(|text| {
                if self.sudo {
                    Command::elevated(text.as_str())
                } else {
                    Command::new(text.as_str())
                }
            })
            .collect())
    }

    pub fn execute(&self) -> Result<()> {
        let commands = self.plan()?;
        let config = load_config()?;
        let access = self.connect.access(&config)?;
        let connector = Connector::new(SshTransport::new());

        let outcome = run_remote(&connector, &access, &commands)?;
        report_outcome(&outcome, access.target.host(), self.output, stdout_summary)
    }
}
