//! Day-2 operations for a small Kubernetes, MinIO and InnoDB cluster stack.
//!
//! The reusable core is the [`remote::Connector`], which opens a session
//! within a wall-clock retry budget, and the [`runner::SequencedRunner`],
//! which runs an ordered command list and stops at the first failure. The
//! [`tasks`] module builds the fixed operations on top of them.

pub mod config;
pub mod error;
pub mod remote;
pub mod runner;
pub mod scratch;
pub mod tasks;
