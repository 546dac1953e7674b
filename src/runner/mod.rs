//! Ordered command execution that stops at the first failing step.
//!
//! A [`SequencedRunner`] takes a session and a list of [`Command`]s, runs
//! them one by one and returns a [`RunOutcome`]. Commands are never retried
//! or reordered; the outcome's steps are always a prefix of the request.

pub mod elevation;

use crate::error::StepFailure;
use crate::remote::shell;
use crate::remote::transport::{Credential, RemoteSession};
use log::{debug, info, warn};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::borrow::Cow;

/// A single command to run.
///
/// `text` is what the session executes. Anything shown to a person or
/// serialized goes through [`Command::shown_text`] or [`Command::redact`],
/// which mask the registered `secrets`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub text: String,
    pub requires_elevation: bool,
    /// Short description for progress output.
    pub label: Option<String>,
    /// Values that appear in `text` but must never be displayed.
    pub secrets: Vec<String>,
}

impl Command {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            requires_elevation: false,
            label: None,
            secrets: Vec::new(),
        }
    }

    /// Same command, run with escalated privileges.
    pub fn elevated(text: impl Into<String>) -> Self {
        Self {
            requires_elevation: true,
            ..Self::new(text)
        }
    }

    pub fn labeled(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Registers a value that is masked wherever the command is shown.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// Copy of `text` with every registered secret masked.
    pub fn redact(&self, text: &str) -> String {
        self.secrets.iter().fold(text.to_string(), |acc, secret| {
            let quoted = shell::quote(secret);
            let acc = if quoted != *secret {
                acc.replace(&quoted, "'***'")
            } else {
                acc
            };
            acc.replace(secret.as_str(), "***")
        })
    }

    /// The command text as it may be printed or logged.
    pub fn shown_text(&self) -> String {
        self.redact(&self.text)
    }

    /// The label if set, otherwise the shown command text.
    pub fn display_name(&self) -> Cow<'_, str> {
        match &self.label {
            Some(label) => Cow::Borrowed(label.as_str()),
            None => Cow::Owned(self.shown_text()),
        }
    }
}

impl Serialize for Command {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Command", 3)?;
        state.serialize_field("text", &self.shown_text())?;
        state.serialize_field("requires_elevation", &self.requires_elevation)?;
        match &self.label {
            Some(label) => state.serialize_field("label", label)?,
            None => state.skip_field("label")?,
        }
        state.end()
    }
}

/// Captured outcome of one executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub command: Command,
    /// `-1` when the transport failed before an exit status was read.
    pub exit_status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl StepResult {
    /// Non-zero exit, or error output beyond the elevation prompt.
    pub fn is_failure(&self) -> bool {
        self.exit_status != 0 || elevation::has_genuine_error_output(&self.stderr)
    }

    /// Error output with elevation prompt artifacts removed.
    pub fn error_text(&self) -> String {
        elevation::strip_prompt_artifacts(&self.stderr)
    }

    fn failure_reason(&self) -> String {
        let errors = self.command.redact(&self.error_text());
        let errors = errors.trim();
        if errors.is_empty() {
            format!("exit status {}", self.exit_status)
        } else {
            format!("exit status {}: {}", self.exit_status, errors)
        }
    }
}

impl Serialize for StepResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StepResult", 4)?;
        state.serialize_field("command", &self.command)?;
        state.serialize_field("exit_status", &self.exit_status)?;
        state.serialize_field("stdout", &self.command.redact(&self.stdout))?;
        state.serialize_field("stderr", &self.command.redact(&self.stderr))?;
        state.end()
    }
}

/// Lifecycle of a runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Failed,
}

/// Terminal result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    /// Results of every executed step, including the failed one.
    pub completed_steps: Vec<StepResult>,
    pub failed_at: Option<usize>,
    pub failure_reason: Option<String>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.failed_at.is_none()
    }

    pub fn state(&self) -> RunState {
        if self.is_success() {
            RunState::Completed
        } else {
            RunState::Failed
        }
    }

    /// The result of the failed step, if any.
    pub fn failed_step(&self) -> Option<&StepResult> {
        self.failed_at.and_then(|i| self.completed_steps.get(i))
    }

    /// Stdout of the last executed step, trimmed.
    pub fn last_stdout(&self) -> Option<&str> {
        self.completed_steps.last().map(|s| s.stdout.trim())
    }

    /// Converts to a `Result`, for callers that want `?`.
    pub fn into_result(self) -> Result<Vec<StepResult>, StepFailure> {
        match self.failed_at {
            None => Ok(self.completed_steps),
            Some(index) => Err(StepFailure {
                index,
                command: self
                    .completed_steps
                    .get(index)
                    .map(|s| s.command.shown_text())
                    .unwrap_or_default(),
                reason: self.failure_reason.unwrap_or_default(),
            }),
        }
    }
}

/// Single-use executor for an ordered command list.
///
/// `run` consumes the runner, so a runner can never go back to `Idle`.
#[derive(Debug)]
pub struct SequencedRunner {
    elevation_credential: Option<Credential>,
    state: RunState,
}

impl SequencedRunner {
    pub fn new(elevation_credential: Option<Credential>) -> Self {
        Self {
            elevation_credential,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            matches!(
                (self.state, next),
                (RunState::Idle, RunState::Running)
                    | (RunState::Running, RunState::Running)
                    | (RunState::Running, RunState::Completed)
                    | (RunState::Running, RunState::Failed)
            ),
            "illegal runner transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("Runner {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// Executes `commands` in order against `session`.
    ///
    /// Stops at the first step that exits non-zero or writes genuine error
    /// output. A transport error counts as a failure of the in-flight step.
    pub fn run<S>(mut self, session: &mut S, commands: &[Command]) -> RunOutcome
    where
        S: RemoteSession + ?Sized,
    {
        self.transition(RunState::Running);
        info!(
            "Running {} command(s) on {}",
            commands.len(),
            session.describe()
        );

        let mut completed_steps = Vec::with_capacity(commands.len());

        for (index, command) in commands.iter().enumerate() {
            debug!("Step {}: {}", index, command.shown_text());
            let result = self.execute_step(session, command);

            if result.is_failure() {
                let reason = result.failure_reason();
                warn!(
                    "Step {} ({}) failed: {}",
                    index,
                    command.display_name(),
                    reason
                );
                completed_steps.push(result);
                self.transition(RunState::Failed);
                return RunOutcome {
                    completed_steps,
                    failed_at: Some(index),
                    failure_reason: Some(reason),
                };
            }

            completed_steps.push(result);
            self.transition(RunState::Running);
        }

        self.transition(RunState::Completed);
        RunOutcome {
            completed_steps,
            failed_at: None,
            failure_reason: None,
        }
    }

    fn execute_step<S>(&self, session: &mut S, command: &Command) -> StepResult
    where
        S: RemoteSession + ?Sized,
    {
        let executed = if command.requires_elevation {
            match &self.elevation_credential {
                Some(cred) => {
                    let payload = elevation::stdin_payload(cred.expose());
                    session.execute(&elevation::wrap(&command.text), Some(&payload))
                }
                None => {
                    return StepResult {
                        command: command.clone(),
                        exit_status: -1,
                        stdout: String::new(),
                        stderr: "elevation required but no elevation credential was supplied"
                            .to_string(),
                    }
                }
            }
        } else {
            session.execute(&command.text, None)
        };

        match executed {
            Ok(raw) => StepResult {
                command: command.clone(),
                exit_status: raw.exit_status,
                stdout: raw.stdout,
                stderr: raw.stderr,
            },
            Err(e) => StepResult {
                command: command.clone(),
                exit_status: -1,
                stdout: String::new(),
                stderr: e.to_string(),
            },
        }
    }
}
