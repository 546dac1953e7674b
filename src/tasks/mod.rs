//! The fixed set of day-2 operations.
//!
//! Every remote operation follows the same shape: build a command list,
//! open one session through the [`Connector`], run the list with a
//! [`SequencedRunner`], and let the session close when it goes out of scope.

pub mod bucket;
pub mod drain;
pub mod innodb;
pub mod join_token;
pub mod label;

use crate::error::{Error, Result};
use crate::remote::clock::Clock;
use crate::remote::connector::Connector;
use crate::remote::retry::RetryPolicy;
use crate::remote::transport::{Credential, Target, Transport};
use crate::runner::{Command, RunOutcome, SequencedRunner};
use log::debug;

/// Everything needed to reach one host and elevate on it.
#[derive(Debug, Clone)]
pub struct RemoteAccess {
    pub target: Target,
    pub credential: Credential,
    /// Password piped to sudo; `None` disables elevated commands.
    pub elevation: Option<Credential>,
    pub policy: RetryPolicy,
}

impl RemoteAccess {
    /// Access where the login password doubles as the sudo password.
    pub fn new(target: Target, credential: Credential, policy: RetryPolicy) -> Self {
        Self {
            elevation: Some(credential.clone()),
            target,
            credential,
            policy,
        }
    }

    pub fn with_elevation(mut self, elevation: Option<Credential>) -> Self {
        self.elevation = elevation;
        self
    }
}

/// Connects to `access.target` and runs `commands` in one session.
///
/// # Errors
///
/// Only a connection failure is an `Err`; step failures are reported in the
/// returned [`RunOutcome`].
pub fn run_remote<T, C>(
    connector: &Connector<T, C>,
    access: &RemoteAccess,
    commands: &[Command],
) -> Result<RunOutcome>
where
    T: Transport,
    C: Clock,
{
    let mut session = connector.connect(&access.target, &access.credential, &access.policy)?;
    let outcome = SequencedRunner::new(access.elevation.clone()).run(&mut session, commands);
    debug!("Releasing session to {}", access.target);
    Ok(outcome)
}

/// Checks a Kubernetes node name (RFC 1123 subdomain).
pub fn validate_node_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name.len() <= 253
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
        && name
            .split('.')
            .all(|part| !part.is_empty() && !part.starts_with('-') && !part.ends_with('-'));

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidInput(format!(
            "'{}' is not a valid Kubernetes node name",
            name
        )))
    }
}
