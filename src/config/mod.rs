//! Configuration management for nodeops.
//!
//! This module handles loading and saving the optional configuration file
//! that names SSH targets and sets default connection budgets. Credentials
//! are never stored here; they come from flags or environment variables.
//!
//! # Configuration File Location
//!
//! The configuration file is stored at:
//! - Linux: `~/.config/nodeops/config.yml`
//! - macOS: `~/Library/Application Support/nodeops/config.yml`
//! - Windows: `C:\Users\<User>\AppData\Roaming\nodeops\config.yml`
//!
//! # Example Configuration
//!
//! ```yaml
//! targets:
//!   controller:
//!     host: "k8s-cp-01.example.com"
//!     user: "ops"
//!     port: 22
//!   minio:
//!     host: "minio-01.example.com"
//!     user: "ops"
//!     ssh_key: "~/.ssh/id_ed25519"
//! defaults:
//!   total_timeout_secs: 180
//!   retry_interval_secs: 5
//!   attempt_timeout_secs: 10
//! minio:
//!   alias: "minios3"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::remote::retry::RetryPolicy;
use crate::remote::transport::Target;

/// Default SSH port
const DEFAULT_SSH_PORT: u16 = 22;

/// Default wall-clock budget for establishing a session, in seconds
const DEFAULT_TOTAL_TIMEOUT: u64 = 180;

/// Default pause between connection attempts, in seconds
const DEFAULT_RETRY_INTERVAL: u64 = 5;

/// Default TCP/handshake timeout for a single attempt, in seconds
const DEFAULT_ATTEMPT_TIMEOUT: u64 = 10;

/// Default `mcli` alias for the object store
const DEFAULT_MINIO_ALIAS: &str = "minios3";

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Named SSH targets
    #[serde(default)]
    pub targets: BTreeMap<String, TargetConfig>,

    /// Connection budget defaults
    #[serde(default)]
    pub defaults: ConnectDefaults,

    /// Object store settings
    #[serde(default)]
    pub minio: MinioSettings,
}

/// Configuration for a single SSH target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Hostname or IP address
    pub host: String,

    /// SSH username
    pub user: String,

    /// SSH port (default: 22)
    #[serde(default = "default_ssh_port")]
    pub port: u16,

    /// Private key file, tried before password authentication
    pub ssh_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectDefaults {
    #[serde(default = "default_total_timeout")]
    pub total_timeout_secs: u64,

    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,

    #[serde(default = "default_attempt_timeout")]
    pub attempt_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinioSettings {
    /// `mcli` alias configured on the object-store host
    #[serde(default = "default_minio_alias")]
    pub alias: String,
}

fn default_ssh_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_total_timeout() -> u64 {
    DEFAULT_TOTAL_TIMEOUT
}

fn default_retry_interval() -> u64 {
    DEFAULT_RETRY_INTERVAL
}

fn default_attempt_timeout() -> u64 {
    DEFAULT_ATTEMPT_TIMEOUT
}

fn default_minio_alias() -> String {
    DEFAULT_MINIO_ALIAS.to_string()
}

impl Default for ConnectDefaults {
    fn default() -> Self {
        Self {
            total_timeout_secs: DEFAULT_TOTAL_TIMEOUT,
            retry_interval_secs: DEFAULT_RETRY_INTERVAL,
            attempt_timeout_secs: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

impl Default for MinioSettings {
    fn default() -> Self {
        Self {
            alias: DEFAULT_MINIO_ALIAS.to_string(),
        }
    }
}

impl ConnectDefaults {
    /// Builds a validated retry policy from these defaults.
    pub fn retry_policy(&self) -> Result<RetryPolicy> {
        RetryPolicy::new(
            Duration::from_secs(self.total_timeout_secs),
            Duration::from_secs(self.retry_interval_secs),
        )
        .map(|p| p.with_attempt_timeout(Duration::from_secs(self.attempt_timeout_secs)))
    }
}

impl Config {
    /// Returns the default configuration file path for the current platform.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nodeops").join("config.yml"))
    }

    /// Loads configuration from the default location.
    ///
    /// Returns `Ok(Config::default())` if no config file exists.
    pub fn load() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Loads configuration from a specific file path.
    ///
    /// Returns `Ok(Config::default())` if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read config file {}: {}\n\n\
                     Suggestions:\n\
                     • Check file permissions: ls -la {}\n\
                     • Recreate it with: nodeops config init --force",
                    path.display(),
                    e,
                    path.display()
                ),
            ))
        })?;

        serde_yaml::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file {}: {}\n\n\
                 Suggestions:\n\
                 • Check YAML syntax and indentation (spaces, not tabs)\n\
                 • Example target entry:\n\
                 targets:\n\
                   controller:\n\
                     host: \"k8s-cp-01.example.com\"\n\
                     user: \"ops\"",
                path.display(),
                e
            ))
        })
    }

    /// Saves configuration to the default location.
    pub fn save(&self) -> Result<()> {
        match Self::default_path() {
            Some(path) => self.save_to(&path),
            None => Err(Error::Config(
                "Could not determine config directory (is HOME set?)".to_string(),
            )),
        }
    }

    /// Saves configuration to a specific file path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, contents).map_err(|e| {
            Error::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to write config file {}: {}", path.display(), e),
            ))
        })
    }

    /// Gets a target configuration by name.
    pub fn get_target(&self, name: &str) -> Option<&TargetConfig> {
        self.targets.get(name)
    }

    /// Adds or updates a target configuration.
    pub fn set_target(&mut self, name: String, target: TargetConfig) {
        self.targets.insert(name, target);
    }

    /// Removes a target configuration.
    pub fn remove_target(&mut self, name: &str) -> Option<TargetConfig> {
        self.targets.remove(name)
    }

    /// Resolves a host argument into a [`Target`].
    ///
    /// A configured target name wins; otherwise `host_or_name` is used as a
    /// literal hostname and `user` must be supplied.
    pub fn resolve_target(
        &self,
        host_or_name: &str,
        user: Option<&str>,
        port: Option<u16>,
    ) -> Result<Target> {
        if let Some(tc) = self.get_target(host_or_name) {
            let mut target = Target::new(tc.host.clone(), user.unwrap_or(&tc.user))
                .with_port(port.unwrap_or(tc.port));
            if let Some(key) = tc.expanded_ssh_key() {
                target = target.with_identity(key);
            }
            return Ok(target);
        }

        let user = user.ok_or_else(|| {
            Error::InvalidInput(format!(
                "'{}' is not a configured target; pass --user to connect to it directly",
                host_or_name
            ))
        })?;

        Ok(Target::new(host_or_name, user).with_port(port.unwrap_or(DEFAULT_SSH_PORT)))
    }
}

impl TargetConfig {
    pub fn new(host: String, user: String) -> Self {
        Self {
            host,
            user,
            port: DEFAULT_SSH_PORT,
            ssh_key: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_ssh_key(mut self, key_path: String) -> Self {
        self.ssh_key = Some(key_path);
        self
    }

    /// Returns the SSH connection string (user@host[:port]).
    pub fn connection_string(&self) -> String {
        if self.port == DEFAULT_SSH_PORT {
            format!("{}@{}", self.user, self.host)
        } else {
            format!("{}@{}:{}", self.user, self.host, self.port)
        }
    }

    /// Expands the SSH key path, replacing ~ with the home directory.
    pub fn expanded_ssh_key(&self) -> Option<PathBuf> {
        self.ssh_key.as_deref().map(expand_home)
    }
}

/// Expands a leading `~/` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}
