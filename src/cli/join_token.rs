//! `nodeops join-token`: print a kubeadm join command from the controller.

use anyhow::Result;
use clap::Args;
use console::style;

use super::{load_config, report_outcome, stdout_summary, ConnectArgs, OutputArgs};
use nodeops::remote::{Connector, SshTransport};
use nodeops::tasks::join_token;

#[derive(Args)]
#[command(about = "Create a bootstrap token on the controller and print the join command")]
pub struct JoinTokenCommand {
    #[command(flatten)]
    pub connect: ConnectArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl JoinTokenCommand {
    pub fn execute(&self) -> Result<()> {
        let config = load_config()?;
        let access = self.connect.access(&config)?;
        let connector = Connector::new(SshTransport::new());

        let outcome = join_token::fetch(&connector, &access)?;
        report_outcome(&outcome, access.target.host(), self.output, stdout_summary)?;

        if !self.output.json && join_token::join_command(&outcome).is_none() {
            eprintln!(
                "{} join command is empty, token creation might have failed",
                style("WARNING:").yellow()
            );
        }
        Ok(())
    }
}
