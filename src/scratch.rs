//! Short-lived files holding secrets for downstream tools.

use crate::error::Result;
use log::debug;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// An owner-only temporary file, deleted when dropped.
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Creates a file with mode 0600 in the system temp dir and writes `contents`.
    pub fn create(prefix: &str, suffix: &str, contents: &str) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        restrict_to_owner(file.path())?;

        file.write_all(contents.as_bytes())?;
        file.flush()?;

        debug!("Created scratch file {}", file.path().display());
        Ok(Self { file })
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        debug!("Removing scratch file {}", self.file.path().display());
    }
}

#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> std::io::Result<()> {
    Ok(())
}
