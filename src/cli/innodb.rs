//! `nodeops innodb`: bootstrap a MySQL InnoDB cluster from this machine.

use anyhow::{Context, Result};
use clap::Args;
use std::time::Duration;

use super::{report_outcome, stdout_summary, OutputArgs};
use nodeops::remote::{Credential, SystemClock};
use nodeops::tasks::innodb::{self, ClusterSpec, MysqlShell};

#[derive(Args)]
#[command(about = "Configure MySQL instances and join them into an InnoDB cluster using mysqlsh")]
pub struct InnodbCommand {
    /// Cluster administrator account
    #[arg(long, env = "INNODB_ADMIN_USER", default_value = innodb::DEFAULT_ADMIN_USER)]
    pub admin_user: String,

    /// Cluster administrator password
    #[arg(long, env = "INNODB_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: String,

    /// Name of the cluster
    #[arg(long, env = "INNODB_CLS_NAME", default_value = innodb::DEFAULT_CLUSTER_NAME)]
    pub cluster_name: String,

    /// Member hosts as a JSON array, e.g. '["db1","db2","db3"]'
    #[arg(long, env = "INNODB_DB_HOSTS", default_value = r#"["localhost"]"#)]
    pub hosts: String,

    /// Host the cluster is created on (defaults to this machine's hostname)
    #[arg(long)]
    pub primary: Option<String>,

    /// Seconds to wait for the instances to settle before starting
    #[arg(long, default_value_t = innodb::DEFAULT_SETTLE.as_secs())]
    pub settle_secs: u64,

    /// MySQL Shell binary
    #[arg(long, default_value = "mysqlsh")]
    pub mysqlsh: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl InnodbCommand {
    fn spec(&self) -> Result<ClusterSpec> {
        let hosts = innodb::parse_hosts(&self.hosts)?;
        let primary = match &self.primary {
            Some(primary) => primary.clone(),
            None => innodb::local_hostname()?,
        };
        Ok(ClusterSpec {
            admin_user: self.admin_user.clone(),
            admin_password: Credential::new(self.admin_password.clone()),
            cluster_name: self.cluster_name.clone(),
            hosts,
            primary,
        })
    }

    pub fn execute(&self) -> Result<()> {
        let spec = self.spec()?;
        let script_shell = MysqlShell::with_binary(self.mysqlsh.as_str());

        let outcome = innodb::bootstrap(
            &script_shell,
            &SystemClock::new(),
            Duration::from_secs(self.settle_secs),
            &spec,
        )
        .context("InnoDB cluster bootstrap failed")?;
        report_outcome(&outcome, &spec.primary, self.output, stdout_summary)
    }
}
