//! Transport seam between the connector/runner core and concrete sessions.
//!
//! The core only needs two capabilities: opening an authenticated session
//! to a [`Target`] and executing a command text on it. `SshTransport`
//! provides them over SSH, `LocalSession` over a local shell, and tests
//! provide scripted fakes.

use crate::error::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One remote endpoint. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: u16,
    user: String,
    identity: Option<PathBuf>,
}

impl Target {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            user: user.into(),
            identity: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Private key file tried before password authentication.
    pub fn with_identity(mut self, key: impl Into<PathBuf>) -> Self {
        self.identity = Some(key.into());
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn identity(&self) -> Option<&Path> {
        self.identity.as_deref()
    }

    /// `host:port`, as used for socket resolution and log lines.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

/// A secret supplied by the caller. Never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Raw outcome of one command execution, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutput {
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

/// An open, authenticated command-execution channel.
pub trait RemoteSession {
    /// Runs `command` to completion, feeding `stdin` (if any) to it first.
    ///
    /// Blocks until output and exit status have been fully read. An `Err`
    /// means the transport itself failed; a non-zero exit is an `Ok`.
    fn execute(&mut self, command: &str, stdin: Option<&[u8]>) -> Result<RawOutput>;

    /// Human-readable description of where commands run.
    fn describe(&self) -> String;
}

/// Something that can open sessions to targets.
pub trait Transport {
    type Session: RemoteSession;

    /// Makes a single attempt to open an authenticated session.
    fn open_session(
        &self,
        target: &Target,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<Self::Session>;
}

impl<S: RemoteSession + ?Sized> RemoteSession for Box<S> {
    fn execute(&mut self, command: &str, stdin: Option<&[u8]>) -> Result<RawOutput> {
        (**self).execute(command, stdin)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
