//! Session establishment and command transport.
//!
//! This module provides the pieces needed to reach a host: the transport
//! seam and its SSH and local implementations, the deadline-bounded
//! connector used while nodes are still provisioning, and diagnostics for
//! when reaching them fails.

pub mod clock;
pub mod connector;
pub mod diagnostics;
pub mod executor;
pub mod local;
pub mod retry;
pub mod shell;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use connector::Connector;
pub use diagnostics::{diagnose_connection_failure, diagnose_step_failure};
pub use executor::{SshSession, SshTransport};
pub use local::LocalSession;
pub use retry::{retry_until_deadline, CancelToken, RetryPolicy};
pub use transport::{Credential, RawOutput, RemoteSession, Target, Transport};
