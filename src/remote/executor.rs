//! SSH-based remote command execution.
//!
//! `SshTransport` makes single connection attempts (TCP connect with
//! timeout, handshake, authentication); retrying is left to the connector.
//! `SshSession` runs commands over exec channels and disconnects when
//! dropped.

use crate::error::{Error, Result};
use crate::remote::transport::{Credential, RawOutput, RemoteSession, Target, Transport};
use log::{debug, warn};
use ssh2::Session;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Opens password- or key-authenticated SSH sessions.
#[derive(Debug, Clone, Copy, Default)]
pub struct SshTransport;

impl SshTransport {
    pub fn new() -> Self {
        Self
    }

    fn authenticate(sess: &Session, target: &Target, credential: &Credential) -> Result<()> {
        debug!("Authenticating as user: {}", target.user());

        if let Some(key_path) = target.identity() {
            debug!("Attempting public key authentication with: {:?}", key_path);
            match sess.userauth_pubkey_file(target.user(), None, key_path, None) {
                Ok(()) => {
                    debug!("Public key authentication successful");
                    return Ok(());
                }
                Err(e) => warn!("Public key authentication failed: {}", e),
            }
        }

        if !credential.is_empty() {
            debug!("Attempting password authentication");
            match sess.userauth_password(target.user(), credential.expose()) {
                Ok(()) => {
                    debug!("Password authentication successful");
                    return Ok(());
                }
                Err(e) => warn!("Password authentication failed: {}", e),
            }
        }

        debug!("Attempting agent authentication");
        match sess.userauth_agent(target.user()) {
            Ok(()) if sess.authenticated() => {
                debug!("Agent authentication successful");
                return Ok(());
            }
            Ok(()) => warn!("Agent authentication did not authenticate the session"),
            Err(e) => warn!("Agent authentication failed: {}", e),
        }

        Err(Error::Authentication(format!(
            "no method accepted for user {} on {}",
            target.user(),
            target.endpoint()
        )))
    }
}

impl Transport for SshTransport {
    type Session = SshSession;

    fn open_session(
        &self,
        target: &Target,
        credential: &Credential,
        timeout: Duration,
    ) -> Result<SshSession> {
        debug!("Attempting SSH connection to {}", target.endpoint());

        let addr = target
            .endpoint()
            .to_socket_addrs()
            .map_err(|e| {
                Error::Transport(format!("Failed to resolve host '{}': {}", target.host(), e))
            })?
            .next()
            .ok_or_else(|| {
                Error::Transport(format!("No addresses found for host '{}'", target.host()))
            })?;

        let tcp = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            Error::Transport(format!("Failed to connect to {}: {}", target.endpoint(), e))
        })?;

        let mut sess = Session::new()
            .map_err(|e| Error::Transport(format!("Failed to create SSH session: {}", e)))?;
        sess.set_tcp_stream(tcp);
        sess.set_timeout(u32::try_from(timeout.as_millis()).unwrap_or(u32::MAX));
        sess.handshake()
            .map_err(|e| Error::Transport(format!("SSH handshake failed: {}", e)))?;

        Self::authenticate(&sess, target, credential)?;

        // Commands may legitimately run longer than the connect timeout.
        sess.set_timeout(0);

        debug!("SSH connection to {} established", target.endpoint());
        Ok(SshSession {
            sess,
            endpoint: target.to_string(),
            poisoned: false,
        })
    }
}

/// An authenticated SSH connection.
///
/// After a transport error the session is poisoned and rejects further
/// commands.
pub struct SshSession {
    sess: Session,
    endpoint: String,
    poisoned: bool,
}

impl SshSession {
    fn execute_inner(&mut self, command: &str, stdin: Option<&[u8]>) -> Result<RawOutput> {
        let mut channel = self
            .sess
            .channel_session()
            .map_err(|e| Error::Transport(format!("Failed to open channel: {}", e)))?;

        channel
            .exec(command)
            .map_err(|e| Error::Transport(format!("Failed to execute command: {}", e)))?;

        if let Some(input) = stdin {
            channel.write_all(input)?;
            channel.flush()?;
        }
        channel.send_eof()?;

        let stdout = read_lossy(&mut channel)?;
        let stderr = read_lossy(&mut channel.stderr())?;

        channel
            .wait_close()
            .map_err(|e| Error::Transport(format!("Failed to close channel: {}", e)))?;

        let exit_status = channel
            .exit_status()
            .map_err(|e| Error::Transport(format!("Failed to get exit status: {}", e)))?;
        let signal = channel
            .exit_signal()
            .map_err(|e| Error::Transport(format!("Failed to get exit signal: {}", e)))?
            .exit_signal;

        let (exit_status, stderr) = apply_exit_signal(exit_status, signal.as_deref(), stderr);
        Ok(RawOutput {
            exit_status,
            stdout,
            stderr,
        })
    }
}

/// Reads a channel stream to the end, replacing invalid UTF-8.
fn read_lossy<R: Read>(reader: &mut R) -> std::io::Result<String> {
    let mut buf = Vec::new();
    reader.read_to_end(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Folds an `exit-signal` report into the status the way a shell does.
///
/// libssh2 reports exit status 0 for a process killed by a signal, so the
/// signal has to be checked separately.
fn apply_exit_signal(exit_status: i32, signal: Option<&str>, mut stderr: String) -> (i32, String) {
    let name = match signal {
        Some(name) => name.trim_start_matches("SIG"),
        None => return (exit_status, stderr),
    };

    if !stderr.is_empty() && !stderr.ends_with('\n') {
        stderr.push('\n');
    }
    stderr.push_str(&format!("killed by signal SIG{}", name));

    let status = signal_number(name).map(|n| 128 + n).unwrap_or(255);
    (status, stderr)
}

fn signal_number(name: &str) -> Option<i32> {
    let number = match name {
        "HUP" => 1,
        "INT" => 2,
        "QUIT" => 3,
        "ILL" => 4,
        "ABRT" => 6,
        "FPE" => 8,
        "KILL" => 9,
        "USR1" => 10,
        "SEGV" => 11,
        "USR2" => 12,
        "PIPE" => 13,
        "ALRM" => 14,
        "TERM" => 15,
        _ => return None,
    };
    Some(number)
}

impl RemoteSession for SshSession {
    fn execute(&mut self, command: &str, stdin: Option<&[u8]>) -> Result<RawOutput> {
        if self.poisoned {
            return Err(Error::Transport(format!(
                "session to {} is no longer usable after an earlier transport error",
                self.endpoint
            )));
        }

        debug!("Opening exec channel on {}", self.endpoint);
        match self.execute_inner(command, stdin) {
            Ok(output) => {
                debug!("Command exit status: {}", output.exit_status);
                Ok(output)
            }
            Err(e) => {
                self.poisoned = true;
                Err(match e {
                    Error::Transport(_) => e,
                    other => Error::Transport(other.to_string()),
                })
            }
        }
    }

    fn describe(&self) -> String {
        self.endpoint.clone()
    }
}

impl Drop for SshSession {
    fn drop(&mut self) {
        debug!("Closing SSH session to {}", self.endpoint);
        if let Err(e) = self.sess.disconnect(None, "nodeops done", None) {
            debug!("Disconnect from {} failed: {}", self.endpoint, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_utf8_output_is_kept() {
        let mut stream: &[u8] = b"node/w1 \xff\xfe drained\n";
        assert_eq!(
            read_lossy(&mut stream).unwrap(),
            "node/w1 \u{FFFD}\u{FFFD} drained\n"
        );
    }

    #[test]
    fn test_exit_signal_overrides_zero_status() {
        assert_eq!(
            apply_exit_signal(0, Some("TERM"), String::new()),
            (143, "killed by signal SIGTERM".to_string())
        );
        assert_eq!(
            apply_exit_signal(0, Some("KILL"), "evicting pod web-1".to_string()),
            (137, "evicting pod web-1\nkilled by signal SIGKILL".to_string())
        );
        assert_eq!(apply_exit_signal(0, Some("XCPU"), String::new()).0, 255);
    }

    #[test]
    fn test_no_exit_signal_keeps_status() {
        assert_eq!(
            apply_exit_signal(3, None, "boom\n".to_string()),
            (3, "boom\n".to_string())
        );
    }

    #[test]
    fn test_unresolvable_host_is_transport_error() {
        let target = Target::new("nodeops-test.invalid", "ops");
        let result = SshTransport::new().open_session(
            &target,
            &Credential::new("pw"),
            Duration::from_millis(200),
        );

        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_refused_port_is_transport_error() {
        // Bind then drop a listener to get a local port with nothing on it.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = Target::new("127.0.0.1", "ops").with_port(port);

        let result = SshTransport::new().open_session(
            &target,
            &Credential::new("pw"),
            Duration::from_millis(500),
        );

        match result {
            Err(Error::Transport(msg)) => assert!(msg.contains("Failed to connect")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("connected to a closed port"),
        }
    }
}
