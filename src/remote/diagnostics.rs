//! Troubleshooting hints for connection and step failures.
//!
//! These functions never change control flow; they turn an error into a
//! message with suggestions that the CLI prints next to the failure.

use crate::error::ConnectionFailure;
use crate::remote::transport::Target;
use crate::runner::StepResult;

/// Explains why a session could not be established.
pub fn diagnose_connection_failure(failure: &ConnectionFailure, target: &Target) -> String {
    let cause = failure.cause.to_string().to_lowercase();
    let mut suggestions = Vec::new();

    if cause.contains("connection refused")
        || cause.contains("timed out")
        || cause.contains("no route to host")
        || cause.contains("failed to resolve")
    {
        suggestions.push(format!("• Verify the host '{}' is reachable", target.host()));
        suggestions.push(format!(
            "• Check that sshd is listening on port {} (try: ssh -p {} {})",
            target.port(),
            target.port(),
            target.host()
        ));
        suggestions.push(format!(
            "• If the node is still provisioning, raise the wait budget (currently {:?})",
            failure.elapsed
        ));
    }

    if cause.contains("authentication") || cause.contains("permission denied") {
        suggestions.push(format!(
            "• Verify the password for user '{}' (NODEOPS_PASSWORD or --password)",
            target.user()
        ));
        match target.identity() {
            Some(key) => {
                suggestions.push(format!("• Check that the key exists: {}", key.display()));
                suggestions.push(format!(
                    "• Verify the public key is in ~/.ssh/authorized_keys on {}",
                    target.host()
                ));
            }
            None => {
                suggestions.push(
                    "• Check that password authentication is enabled in sshd_config".to_string(),
                );
            }
        }
    }

    if cause.contains("handshake") || cause.contains("host key") {
        suggestions.push(
            "• The SSH handshake failed; check the server's supported algorithms".to_string(),
        );
        suggestions.push(format!(
            "• Test manually: ssh -v -p {} {}@{}",
            target.port(),
            target.user(),
            target.host()
        ));
    }

    if cause.contains("cancelled") {
        suggestions.push(
            "• The wait was cancelled before the target became reachable".to_string(),
        );
    }

    if suggestions.is_empty() {
        suggestions.push("• Verify the remote host is accessible".to_string());
        suggestions.push(format!(
            "• Test the connection manually: ssh -p {} {}@{}",
            target.port(),
            target.user(),
            target.host()
        ));
    }

    format!(
        "{}\n\nTroubleshooting suggestions:\n{}",
        failure,
        suggestions.join("\n")
    )
}

/// Explains why a command in a sequence failed.
pub fn diagnose_step_failure(step: &StepResult, location: &str) -> String {
    let stderr = step.stderr.to_lowercase();
    let shown = step.command.shown_text();
    let command = shown.as_str();
    let mut suggestions = Vec::new();

    if stderr.contains("incorrect password") || stderr.contains("sorry, try again") {
        suggestions.push("• sudo rejected the elevation password".to_string());
        suggestions.push(
            "• Pass a different one with --sudo-password or NODEOPS_SUDO_PASSWORD".to_string(),
        );
    } else if stderr.contains("not in the sudoers") {
        suggestions.push("• The SSH user is not allowed to use sudo on this host".to_string());
    } else if stderr.contains("command not found") || step.exit_status == 127 {
        suggestions.push(format!(
            "• '{}' is not installed or not in PATH on {}",
            extract_command_name(command),
            location
        ));
        suggestions.push("• Non-interactive SSH sessions may have a shorter PATH".to_string());
    } else if stderr.contains("permission denied") || step.exit_status == 126 {
        suggestions.push("• Permission denied; the command may need elevation".to_string());
    } else if step.exit_status == -1 {
        suggestions.push("• The session dropped while the command was running".to_string());
        suggestions.push(format!("• Check the state of {} before re-running", location));
    }

    if suggestions.is_empty() {
        suggestions.push("• Review the error output above".to_string());
        suggestions.push(format!("• Re-run the command manually on {}", location));
    }

    let mut msg = format!(
        "Command failed on {}\nCommand: {}\nExit status: {}\n",
        location, command, step.exit_status
    );

    let stderr_shown = step.command.redact(step.stderr.trim());
    if !stderr_shown.is_empty() {
        msg.push_str("\nStderr:\n");
        msg.push_str(&indent_text(&stderr_shown, 2));
        msg.push('\n');
    }

    msg.push_str("\nTroubleshooting suggestions:\n");
    msg.push_str(&suggestions.join("\n"));
    msg
}

fn extract_command_name(command: &str) -> &str {
    command.split_whitespace().next().unwrap_or(command)
}

fn indent_text(text: &str, spaces: usize) -> String {
    let indent = " ".repeat(spaces);
    text.lines()
        .map(|line| format!("{}{}", indent, line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::runner::Command;
    use std::time::Duration;

    fn failure(cause: Error) -> ConnectionFailure {
        ConnectionFailure {
            endpoint: "cp-01:22".to_string(),
            attempts: 37,
            elapsed: Duration::from_secs(180),
            cause: Box::new(cause),
        }
    }

    fn step(text: &str, exit_status: i32, stderr: &str) -> StepResult {
        StepResult {
            command: Command::new(text),
            exit_status,
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_diagnose_unreachable_host() {
        let target = Target::new("cp-01", "ops");
        let msg = diagnose_connection_failure(
            &failure(Error::Transport("Failed to connect to cp-01: Connection refused".into())),
            &target,
        );

        assert!(msg.contains("Verify the host 'cp-01' is reachable"));
        assert!(msg.contains("port 22"));
        assert!(msg.contains("37 attempt(s)"));
    }

    #[test]
    fn test_diagnose_auth_failure_with_key() {
        let target = Target::new("cp-01", "ops").with_identity("/keys/id_ed25519");
        let msg = diagnose_connection_failure(
            &failure(Error::Authentication("all methods rejected".into())),
            &target,
        );

        assert!(msg.contains("user 'ops'"));
        assert!(msg.contains("/keys/id_ed25519"));
    }

    #[test]
    fn test_diagnose_generic_connection_failure() {
        let target = Target::new("cp-01", "ops");
        let msg = diagnose_connection_failure(&failure(Error::Transport("weird".into())), &target);
        assert!(msg.contains("Test the connection manually"));
    }

    #[test]
    fn test_diagnose_sudo_password_rejected() {
        let msg = diagnose_step_failure(
            &step(
                "kubectl drain w1",
                1,
                "[sudo] password for ops: Sorry, try again.\nsudo: 1 incorrect password attempt",
            ),
            "cp-01",
        );
        assert!(msg.contains("rejected the elevation password"));
        assert!(msg.contains("Exit status: 1"));
    }

    #[test]
    fn test_diagnose_missing_tool() {
        let msg = diagnose_step_failure(
            &step("mcli mb minios3/b", 127, "sh: mcli: not found"),
            "minio-01",
        );
        assert!(msg.contains("'mcli' is not installed"));
    }

    #[test]
    fn test_diagnose_transport_drop() {
        let msg =
            diagnose_step_failure(&step("kubeadm token create", -1, "channel closed"), "cp-01");
        assert!(msg.contains("session dropped"));
    }

    #[test]
    fn test_step_diagnosis_masks_secrets() {
        let mut failed = step(
            "mcli admin user add minios3 app Sup3rS3cret",
            1,
            "mcli: <ERROR> Unable to add user app (Sup3rS3cret)",
        );
        failed.command = failed.command.clone().with_secret("Sup3rS3cret");

        let msg = diagnose_step_failure(&failed, "minio-01");

        assert!(msg.contains("Command: mcli admin user add minios3 app ***"));
        assert!(msg.contains("Unable to add user app (***)"));
        assert!(!msg.contains("Sup3rS3cret"));
    }

    #[test]
    fn test_indent_text() {
        assert_eq!(indent_text("a\nb", 2), "  a\n  b");
    }
}
