//! Privilege elevation through `sudo -S`.
//!
//! The password reaches sudo on stdin, never on the command line. sudo then
//! writes its prompt to stderr, which must not count as error output.

use crate::remote::shell;

/// Prompt sudo is told to print; `%p` expands to the user being authenticated.
pub const SUDO_PROMPT: &str = "[sudo] password for %p: ";

/// Marker that starts every elevation prompt artifact on stderr.
pub const PROMPT_MARKER: &str = "[sudo]";

/// Wraps `command` so the whole shell text runs as root.
pub fn wrap(command: &str) -> String {
    format!(
        "sudo -S -p {} sh -c {}",
        shell::quote(SUDO_PROMPT),
        shell::quote(command)
    )
}

/// Bytes written to an elevated command's stdin.
pub fn stdin_payload(password: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(password.len() + 1);
    payload.extend_from_slice(password.as_bytes());
    payload.push(b'\n');
    payload
}

/// Removes elevation prompt artifacts from captured stderr.
///
/// sudo prints its prompt without a trailing newline, so whatever the
/// command writes next lands on the same line. On lines starting with the
/// marker, the prompt up to and including the first `": "` is dropped and
/// the remainder kept; lines left empty disappear.
pub fn strip_prompt_artifacts(stderr: &str) -> String {
    stderr
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            if !trimmed.starts_with(PROMPT_MARKER) {
                return Some(line);
            }
            let rest = match trimmed.find(": ") {
                Some(pos) => &trimmed[pos + 2..],
                None => trimmed
                    .strip_suffix(':')
                    .map(|_| "")
                    .unwrap_or(&trimmed[PROMPT_MARKER.len()..]),
            };
            let rest = rest.trim();
            (!rest.is_empty()).then_some(rest)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// True when stderr has content besides elevation prompts.
pub fn has_genuine_error_output(stderr: &str) -> bool {
    !strip_prompt_artifacts(stderr).trim().is_empty()
}
