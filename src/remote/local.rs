//! Local shell execution behind the same session interface as SSH.

use crate::error::{Error, Result};
use crate::remote::transport::{RawOutput, RemoteSession};
use log::debug;
use std::io::Write;
use std::process::{Command, Stdio};

/// Runs commands through `sh -c` on this machine.
#[derive(Debug, Clone)]
pub struct LocalSession {
    shell: String,
}

impl LocalSession {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    /// Uses a different POSIX shell binary.
    pub fn with_shell(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
        }
    }
}

impl Default for LocalSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RemoteSession for LocalSession {
    fn execute(&mut self, command: &str, stdin: Option<&[u8]>) -> Result<RawOutput> {
        // The runner logs the masked command text; sessions never log it.
        debug!("Executing through local {}", self.shell);

        let mut child = Command::new(&self.shell)
            .arg("-c")
            .arg(command)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Transport(format!("Failed to spawn {}: {}", self.shell, e)))?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            // A command that exits without reading stdin closes the pipe early.
            if let Err(e) = pipe.write_all(input) {
                debug!("Writing stdin to local command failed: {}", e);
            }
        }

        let output = child
            .wait_with_output()
            .map_err(|e| Error::Transport(format!("Failed to wait for {}: {}", self.shell, e)))?;

        // Killed by a signal: report like a shell would (128 + signal) when known.
        let exit_status = output.status.code().unwrap_or_else(|| signal_status(&output.status));

        Ok(RawOutput {
            exit_status,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn describe(&self) -> String {
        "localhost".to_string()
    }
}

#[cfg(unix)]
fn signal_status(status: &std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status.signal().map(|s| 128 + s).unwrap_or(-1)
}

#[cfg(not(unix))]
fn signal_status(_status: &std::process::ExitStatus) -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_status() {
        let mut session = LocalSession::new();
        let out = session.execute("echo hello; exit 3", None).unwrap();
        assert_eq!(out.stdout, "hello\n");
        assert_eq!(out.exit_status, 3);
        assert!(out.stderr.is_empty());
    }

    #[test]
    fn test_captures_stderr() {
        let mut session = LocalSession::new();
        let out = session.execute("echo oops >&2", None).unwrap();
        assert_eq!(out.stderr, "oops\n");
        assert_eq!(out.exit_status, 0);
    }

    #[test]
    fn test_feeds_stdin() {
        let mut session = LocalSession::new();
        let out = session.execute("read line; echo got:$line", Some(b"secret\n")).unwrap();
        assert_eq!(out.stdout, "got:secret\n");
    }

    #[test]
    fn test_missing_shell_is_transport_error() {
        let mut session = LocalSession::with_shell("/nonexistent/shell");
        assert!(matches!(
            session.execute("true", None),
            Err(Error::Transport(_))
        ));
    }
}
