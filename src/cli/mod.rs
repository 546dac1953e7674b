//! Command-line front end.
//!
//! Subcommands resolve targets and credentials from flags, environment
//! variables and the config file, call into the library, and turn the
//! outcome into terminal output and an exit status.

pub mod bucket;
pub mod completions;
pub mod config;
pub mod drain;
pub mod exec;
pub mod innodb;
pub mod join_token;
pub mod label;

use anyhow::{Context, Result};
use clap::Args;
use console::style;
use std::time::Duration;

use nodeops::config::Config;
use nodeops::error::NodeopsError;
use nodeops::remote::{diagnose_step_failure, Credential, RetryPolicy};
use nodeops::runner::{RunOutcome, StepResult};
use nodeops::tasks::RemoteAccess;

/// How to reach and authenticate against the host a command runs on.
#[derive(Args, Clone, Debug)]
pub struct ConnectArgs {
    /// Host name or address, or the name of a configured target
    #[arg(long)]
    pub host: String,

    /// SSH user (defaults to the configured target's user)
    #[arg(short, long, env = "NODEOPS_USER")]
    pub user: Option<String>,

    /// SSH port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// SSH password; also used for sudo unless --sudo-password is given
    #[arg(long, env = "NODEOPS_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Password piped to sudo for elevated commands
    #[arg(long, env = "NODEOPS_SUDO_PASSWORD", hide_env_values = true)]
    pub sudo_password: Option<String>,

    /// Total seconds to keep retrying the connection
    #[arg(long)]
    pub wait_secs: Option<u64>,

    /// Seconds between connection attempts
    #[arg(long)]
    pub retry_interval_secs: Option<u64>,

    /// Timeout in seconds for a single connection attempt
    #[arg(long)]
    pub attempt_timeout_secs: Option<u64>,
}

impl ConnectArgs {
    /// Builds the access description, with flags overriding the config file.
    pub fn access(&self, config: &Config) -> Result<RemoteAccess> {
        let target = config.resolve_target(&self.host, self.user.as_deref(), self.port)?;

        let defaults = &config.defaults;
        let total = Duration::from_secs(self.wait_secs.unwrap_or(defaults.total_timeout_secs));
        let interval = Duration::from_secs(
            self.retry_interval_secs
                .unwrap_or(defaults.retry_interval_secs)
                .min(total.as_secs().max(1)),
        );
        let attempt = Duration::from_secs(
            self.attempt_timeout_secs
                .unwrap_or(defaults.attempt_timeout_secs),
        );
        let policy = RetryPolicy::new(total, interval)
            .context("invalid connection budget")?
            .with_attempt_timeout(attempt);

        let credential = Credential::new(self.password.clone());
        let elevation = self
            .sudo_password
            .clone()
            .map(Credential::new)
            .unwrap_or_else(|| credential.clone());

        Ok(RemoteAccess::new(target, credential, policy).with_elevation(Some(elevation)))
    }
}

/// Output format shared by operational commands.
#[derive(Args, Clone, Copy, Debug, Default)]
pub struct OutputArgs {
    /// Print the run outcome as JSON
    #[arg(long)]
    pub json: bool,
}

/// Prints `outcome` and converts a failed run into an error.
///
/// Step status goes to stderr; the text `summarize` produces for each
/// successful step goes to stdout so it can be captured.
pub fn report_outcome<F>(
    outcome: &RunOutcome,
    location: &str,
    output: OutputArgs,
    summarize: F,
) -> Result<()>
where
    F: Fn(&StepResult) -> String,
{
    if output.json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
    } else {
        for (index, step) in outcome.completed_steps.iter().enumerate() {
            if outcome.failed_at == Some(index) {
                eprintln!("{} {}", style("✗").red(), step.command.display_name());
                eprintln!();
                eprintln!("{}", diagnose_step_failure(step, location));
            } else {
                eprintln!("{} {}", style("✓").green(), step.command.display_name());
                let text = step.command.redact(&summarize(step));
                if !text.is_empty() {
                    println!("{}", text);
                }
            }
        }
    }

    outcome
        .clone()
        .into_result()
        .map(|_| ())
        .map_err(NodeopsError::Step)
        .with_context(|| format!("run on {} failed", location))
}

/// Default summary: the step's trimmed stdout.
pub fn stdout_summary(step: &StepResult) -> String {
    step.stdout.trim().to_string()
}

/// Loads the config file, with a pointer to its path on failure.
pub fn load_config() -> Result<Config> {
    Config::load().context("failed to load nodeops configuration")
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeops::config::TargetConfig;
    use nodeops::runner::Command;

    fn args() -> ConnectArgs {
        ConnectArgs {
            host: "cp".to_string(),
            user: None,
            port: None,
            password: "pw".to_string(),
            sudo_password: None,
            wait_secs: None,
            retry_interval_secs: None,
            attempt_timeout_secs: None,
        }
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.set_target(
            "cp".to_string(),
            TargetConfig::new("cp.example.com".to_string(), "ops".to_string()),
        );
        config
    }

    #[test]
    fn test_access_uses_config_defaults() {
        let access = args().access(&config()).unwrap();
        assert_eq!(access.target.host(), "cp.example.com");
        assert_eq!(access.policy.total_timeout(), Duration::from_secs(180));
        assert_eq!(access.elevation, Some(Credential::new("pw")));
    }

    #[test]
    fn test_flags_override_defaults() {
        let mut a = args();
        a.wait_secs = Some(30);
        a.retry_interval_secs = Some(2);
        a.sudo_password = Some("root-pw".to_string());

        let access = a.access(&config()).unwrap();
        assert_eq!(access.policy.total_timeout(), Duration::from_secs(30));
        assert_eq!(access.policy.retry_interval(), Duration::from_secs(2));
        assert_eq!(access.elevation, Some(Credential::new("root-pw")));
    }

    #[test]
    fn test_interval_clamped_to_wait() {
        let mut a = args();
        a.wait_secs = Some(3);
        let access = a.access(&config()).unwrap();
        assert_eq!(access.policy.retry_interval(), Duration::from_secs(3));
    }

    #[test]
    fn test_zero_wait_rejected() {
        let mut a = args();
        a.wait_secs = Some(0);
        assert!(a.access(&config()).is_err());
    }

    fn outcome(exit_status: i32, stderr: &str) -> RunOutcome {
        let step = StepResult {
            command: Command::new("mcli admin user add minios3 app Sup3rS3cret")
                .with_secret("Sup3rS3cret"),
            exit_status,
            stdout: String::new(),
            stderr: stderr.to_string(),
        };
        let failed = step.is_failure();
        RunOutcome {
            completed_steps: vec![step],
            failed_at: failed.then_some(0),
            failure_reason: failed.then(|| format!("exit status {}: {}", exit_status, stderr)),
        }
    }

    #[test]
    fn test_report_success() {
        let result = report_outcome(
            &outcome(0, ""),
            "minio-01",
            OutputArgs::default(),
            stdout_summary,
        );
        assert!(result.is_ok());
    }

    #[test]
    fn test_report_failure_carries_step_failure() {
        let err = report_outcome(
            &outcome(1, "Unable to add new user"),
            "minio-01",
            OutputArgs::default(),
            stdout_summary,
        )
        .unwrap_err();

        assert!(err.to_string().contains("minio-01"));
        match err.downcast_ref::<NodeopsError>() {
            Some(NodeopsError::Step(failure)) => {
                assert_eq!(failure.index, 0);
                assert_eq!(failure.command, "mcli admin user add minios3 app ***");
            }
            other => panic!("expected a step failure, got {:?}", other),
        }
    }
}
