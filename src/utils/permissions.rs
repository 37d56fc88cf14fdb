//! File permission utilities for restricting access to sensitive files.

use std::fs::{File, OpenOptions};
use std::path::Path;

use crate::error::{Result, SshmanError};

/// Set restrictive permissions (owner-only read/write) on a file.
///
/// On Unix systems this sets mode 0o600. On other platforms this is a no-op
/// since the permission model differs.
pub fn restrict_file_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(|e| {
            SshmanError::Other(format!(
                "failed to set permissions on {}: {}",
                path.display(),
                e
            ))
        })?;
    }

    #[cfg(not(unix))]
    {
        let _ = path;
    }

    Ok(())
}

/// Create or truncate a file readable only by its owner (0o600 on Unix).
/// An existing file is tightened as well.
pub fn create_private_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let file = options.open(path)?;
    restrict_file_permissions(path)?;
    Ok(file)
}

/// Permission bits of a local file, as sent with an SCP upload.
pub fn file_mode(metadata: &std::fs::Metadata) -> i32 {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        (metadata.permissions().mode() & 0o777) as i32
    }

    #[cfg(not(unix))]
    {
        let _ = metadata;
        0o644
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_restrict_and_read_mode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secret.csv");
        std::fs::write(&path, "x").unwrap();
        restrict_file_permissions(&path).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert_eq!(file_mode(&meta), 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn test_private_file_is_owner_only() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fresh = dir.path().join("fresh.csv");
        let mut file = create_private_file(&fresh).unwrap();
        file.write_all(b"secret").unwrap();
        assert_eq!(file_mode(&std::fs::metadata(&fresh).unwrap()), 0o600);

        let existing = dir.path().join("existing.csv");
        std::fs::write(&existing, "old contents").unwrap();
        std::fs::set_permissions(&existing, std::fs::Permissions::from_mode(0o644)).unwrap();
        create_private_file(&existing).unwrap();
        assert_eq!(file_mode(&std::fs::metadata(&existing).unwrap()), 0o600);
        assert_eq!(std::fs::read(&existing).unwrap(), b"");
    }

    #[test]
    fn test_restrict_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        if cfg!(unix) {
            assert!(restrict_file_permissions(&missing).is_err());
        }
    }
}
