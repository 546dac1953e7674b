//! Provision a MinIO bucket together with a user, policy and access key.
//!
//! Runs on the object-store host through the `mcli` client, which must
//! already have an alias configured for the server. The steps depend on each
//! other, so the sequence stops at the first failure.

use crate::error::{Error, Result};
use crate::remote::clock::Clock;
use crate::remote::connector::Connector;
use crate::remote::shell;
use crate::remote::transport::{Credential, Transport};
use crate::runner::{Command, RunOutcome, StepResult};
use crate::tasks::{run_remote, RemoteAccess};

pub const DEFAULT_POLICY: &str = "readwrite";

/// What to create.
#[derive(Debug, Clone)]
pub struct BucketRequest {
    /// `mcli` alias of the server
    pub alias: String,
    pub bucket: String,
    pub user: String,
    pub user_secret: Credential,
    pub policy: String,
    pub access_key_name: String,
    pub access_key_description: String,
}

impl BucketRequest {
    pub fn new(
        alias: impl Into<String>,
        bucket: impl Into<String>,
        user: impl Into<String>,
        user_secret: Credential,
    ) -> Self {
        let user = user.into();
        Self {
            alias: alias.into(),
            bucket: bucket.into(),
            access_key_name: format!("{}'s Access Key", user),
            access_key_description: format!("Access key for {}", user),
            user,
            user_secret,
            policy: DEFAULT_POLICY.to_string(),
        }
    }

    pub fn with_policy(mut self, policy: impl Into<String>) -> Self {
        self.policy = policy.into();
        self
    }

    pub fn with_access_key(
        mut self,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.access_key_name = name.into();
        self.access_key_description = description.into();
        self
    }

    fn validate(&self) -> Result<()> {
        // S3 bucket naming: 3-63 chars, lowercase letters, digits, '-' and '.'.
        let bucket_ok = (3..=63).contains(&self.bucket.len())
            && self
                .bucket
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
            && self
                .bucket
                .starts_with(|c: char| c.is_ascii_alphanumeric())
            && self.bucket.ends_with(|c: char| c.is_ascii_alphanumeric());
        if !bucket_ok {
            return Err(Error::InvalidInput(format!(
                "'{}' is not a valid bucket name",
                self.bucket
            )));
        }
        if self.alias.is_empty() || self.alias.contains('/') {
            return Err(Error::InvalidInput(format!("'{}' is not a valid alias", self.alias)));
        }
        if self.user.is_empty() {
            return Err(Error::InvalidInput("user must not be empty".to_string()));
        }
        if self.user_secret.expose().len() < 8 {
            return Err(Error::InvalidInput(
                "user secret must be at least 8 characters".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builds the five provisioning commands.
pub fn commands(req: &BucketRequest) -> Result<Vec<Command>> {
    req.validate()?;
    let alias = req.alias.as_str();

    Ok(vec![
        Command::new(shell::join([
            "mcli",
            "mb",
            format!("{}/{}", alias, req.bucket).as_str(),
        ]))
        .labeled("Creating bucket"),
        Command::new(shell::join([
            "mcli",
            "admin",
            "user",
            "add",
            alias,
            req.user.as_str(),
            req.user_secret.expose(),
        ]))
        .with_secret(req.user_secret.expose())
        .labeled("Adding user"),
        Command::new(shell::join([
            "mcli",
            "admin",
            "policy",
            "attach",
            alias,
            req.policy.as_str(),
            "--user",
            req.user.as_str(),
        ]))
        .labeled("Assigning policy to user"),
        Command::new(shell::join([
            "mcli",
            "admin",
            "user",
            "info",
            alias,
            req.user.as_str(),
        ]))
        .labeled("Confirming policy attachment"),
        Command::new(shell::join([
            "mcli",
            "admin",
            "accesskey",
            "create",
            alias,
            req.user.as_str(),
            "--name",
            req.access_key_name.as_str(),
            "--description",
            req.access_key_description.as_str(),
        ]))
        .labeled("Creating access keys"),
    ])
}

/// Runs the provisioning sequence on the object-store host.
pub fn provision<T: Transport, C: Clock>(
    connector: &Connector<T, C>,
    access: &RemoteAccess,
    req: &BucketRequest,
) -> Result<RunOutcome> {
    let commands = commands(req)?;
    run_remote(connector, access, &commands)
}

/// Text to show for a successful step: its output, or a stock message for
/// steps that print nothing on success.
pub fn step_summary(step: &StepResult) -> String {
    let out = step.stdout.trim();
    if !out.is_empty() {
        return out.to_string();
    }
    match step.command.label.as_deref() {
        Some("Creating bucket") => "Bucket created successfully".to_string(),
        Some("Adding user") => "User added successfully".to_string(),
        Some("Assigning policy to user") => "Policy attached successfully".to_string(),
        _ => String::new(),
    }
}
