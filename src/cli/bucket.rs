//! `nodeops bucket`: provision a MinIO bucket with a dedicated user.

use anyhow::Result;
use clap::Args;

use super::{load_config, report_outcome, ConnectArgs, OutputArgs};
use nodeops::remote::{Connector, Credential, SshTransport};
use nodeops::tasks::bucket::{self, BucketRequest};

#[derive(Args)]
#[command(about = "Create a bucket, a user with a policy, and an access key via mcli")]
pub struct BucketCommand {
    /// Bucket to create
    pub bucket: String,

    /// User that gets access to the bucket
    #[arg(long = "bucket-user")]
    pub bucket_user: String,

    /// Secret key for the new user (at least 8 characters)
    #[arg(long, env = "NODEOPS_BUCKET_USER_SECRET", hide_env_values = true)]
    pub user_secret: String,

    /// mcli alias of the server (defaults to the configured alias)
    #[arg(long)]
    pub alias: Option<String>,

    /// Policy attached to the user
    #[arg(long, default_value = bucket::DEFAULT_POLICY)]
    pub policy: String,

    /// Name of the access key
    #[arg(long)]
    pub access_key_name: Option<String>,

    /// Description of the access key
    #[arg(long)]
    pub access_key_description: Option<String>,

    #[command(flatten)]
    pub connect: ConnectArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl BucketCommand {
    fn request(&self, default_alias: &str) -> BucketRequest {
        let alias = self.alias.as_deref().unwrap_or(default_alias);
        let mut req = BucketRequest::new(
            alias,
            self.bucket.as_str(),
            self.bucket_user.as_str(),
            Credential::new(self.user_secret.clone()),
        )
        .with_policy(self.policy.as_str());

        if self.access_key_name.is_some() || self.access_key_description.is_some() {
            let name = self
                .access_key_name
                .clone()
                .unwrap_or_else(|| req.access_key_name.clone());
            let description = self
                .access_key_description
                .clone()
                .unwrap_or_else(|| req.access_key_description.clone());
            req = req.with_access_key(name, description);
        }
        req
    }

    pub fn execute(&self) -> Result<()> {
        let config = load_config()?;
        let access = self.connect.access(&config)?;
        let req = self.request(&config.minio.alias);
        let connector = Connector::new(SshTransport::new());

        let outcome = bucket::provision(&connector, &access, &req)?;
        report_outcome(&outcome, access.target.host(), self.output, bucket::step_summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        cmd: BucketCommand,
    }

    #[test]
    fn test_alias_falls_back_to_config() {
        let h = Harness::parse_from([
            "t",
            "data",
            "--bucket-user",
            "app",
            "--user-secret",
            "secret123",
            "--host",
            "minio",
            "--password",
            "pw",
        ]);
        let req = h.cmd.request("minios3");
        assert_eq!(req.alias, "minios3");
        assert_eq!(req.policy, "readwrite");
        assert_eq!(req.access_key_name, "app's Access Key");
    }

    #[test]
    fn test_access_key_override() {
        let h = Harness::parse_from([
            "t",
            "data",
            "--bucket-user",
            "app",
            "--user-secret",
            "secret123",
            "--alias",
            "prod",
            "--access-key-name",
            "ci",
            "--host",
            "minio",
            "--password",
            "pw",
        ]);
        let req = h.cmd.request("minios3");
        assert_eq!(req.alias, "prod");
        assert_eq!(req.access_key_name, "ci");
        assert_eq!(req.access_key_description, "Access key for app");
    }
}
