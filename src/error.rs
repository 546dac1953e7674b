use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeopsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SSH error: {0}")]
    Ssh(#[from] ssh2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Transport failure: {0}")]
    Transport(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Connection(#[from] ConnectionFailure),

    #[error(transparent)]
    Step(#[from] StepFailure),
}

/// A session could not be established within the retry budget.
#[derive(Error, Debug)]
#[error("could not connect to {endpoint} after {attempts} attempt(s) in {elapsed:?}: {cause}")]
pub struct ConnectionFailure {
    pub endpoint: String,
    pub attempts: u32,
    pub elapsed: Duration,
    pub cause: Box<NodeopsError>,
}

/// A command in a sequence exited non-zero or wrote genuine error output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("step {index} (`{command}`) failed: {reason}")]
pub struct StepFailure {
    pub index: usize,
    pub command: String,
    pub reason: String,
}

pub type Error = NodeopsError;
pub type Result<T> = std::result::Result<T, Error>;
