//! Unified error type for sshman.
//!
//! All public APIs return `Result<T, SshmanError>`. The variants follow the
//! failure categories an operator can act on: a missing profile, a taken alias,
//! a wrong passphrase, bad input, or an unreachable host.

use std::fmt;

/// The unified error type for all sshman operations.
#[derive(Debug)]
pub enum SshmanError {
    // ── I/O & filesystem ───────────────────────────────────────────────
    /// Filesystem or I/O operation failed.
    Io(std::io::Error),

    // ── Database ───────────────────────────────────────────────────────
    /// SQLite / database operation failed.
    Db(rusqlite::Error),

    // ── Serialization ──────────────────────────────────────────────────
    /// CSV export/import error.
    Csv(csv::Error),

    /// KDL config file parsing error.
    Config(String),

    // ── Lookup errors ──────────────────────────────────────────────────
    /// A requested profile or row was not found.
    NotFound(String),

    /// A profile with this alias already exists.
    DuplicateAlias(String),

    // ── Encryption / credentials ───────────────────────────────────────
    /// Wrong passphrase or corrupted ciphertext. The two are deliberately
    /// indistinguishable.
    Authentication(String),

    // ── Remote host ────────────────────────────────────────────────────
    /// Authentication or transport failure against the remote host.
    Connection(String),

    /// The startup command failed. Reported, never fatal to a session.
    RemoteCommand(String),

    /// Neither or both sides of a transfer name a profile.
    InvalidTransferSpecification(String),

    // ── User interaction ───────────────────────────────────────────────
    /// The user cancelled an interactive operation.
    Cancelled,

    /// User input validation failed.
    Validation(String),

    // ── Catch-all ──────────────────────────────────────────────────────
    /// Any other error.
    Other(String),
}

// ── Display ────────────────────────────────────────────────────────────

impl fmt::Display for SshmanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SshmanError::Io(e) => write!(f, "{}", e),
            SshmanError::Db(e) => write!(f, "database error: {}", e),
            SshmanError::Csv(e) => write!(f, "csv error: {}", e),
            SshmanError::Config(msg) => write!(f, "config error: {}", msg),
            SshmanError::NotFound(msg) => write!(f, "{}", msg),
            SshmanError::DuplicateAlias(alias) => {
                write!(f, "a profile with alias '{}' already exists", alias)
            }
            SshmanError::Authentication(msg) => write!(f, "decryption failed: {}", msg),
            SshmanError::Connection(msg) => write!(f, "connection error: {}", msg),
            SshmanError::RemoteCommand(msg) => write!(f, "startup command failed: {}", msg),
            SshmanError::InvalidTransferSpecification(msg) => {
                write!(f, "invalid transfer: {}", msg)
            }
            SshmanError::Cancelled => write!(f, "cancelled"),
            SshmanError::Validation(msg) => write!(f, "{}", msg),
            SshmanError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for SshmanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SshmanError::Io(e) => Some(e),
            SshmanError::Db(e) => Some(e),
            SshmanError::Csv(e) => Some(e),
            _ => None,
        }
    }
}

// ── From implementations for common error types ────────────────────────

impl From<std::io::Error> for SshmanError {
    fn from(e: std::io::Error) -> Self {
        SshmanError::Io(e)
    }
}

impl From<rusqlite::Error> for SshmanError {
    fn from(e: rusqlite::Error) -> Self {
        SshmanError::Db(e)
    }
}

impl From<csv::Error> for SshmanError {
    fn from(e: csv::Error) -> Self {
        SshmanError::Csv(e)
    }
}

// libssh2 failures are transport failures; surface the message verbatim.
impl From<ssh2::Error> for SshmanError {
    fn from(e: ssh2::Error) -> Self {
        SshmanError::Connection(e.to_string())
    }
}

impl From<String> for SshmanError {
    fn from(s: String) -> Self {
        SshmanError::Other(s)
    }
}

impl From<&str> for SshmanError {
    fn from(s: &str) -> Self {
        SshmanError::Other(s.to_string())
    }
}

// ── Convenience constructors ───────────────────────────────────────────

impl SshmanError {
    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        SshmanError::NotFound(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        SshmanError::Validation(message.into())
    }

    /// Create a decryption/authentication error.
    pub fn authentication(message: impl Into<String>) -> Self {
        SshmanError::Authentication(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        SshmanError::Connection(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        SshmanError::Config(message.into())
    }

    /// Create a transfer specification error.
    pub fn invalid_transfer(message: impl Into<String>) -> Self {
        SshmanError::InvalidTransferSpecification(message.into())
    }

    /// True for failures that came from a wrong passphrase or damaged ciphertext.
    pub fn is_authentication(&self) -> bool {
        matches!(self, SshmanError::Authentication(_))
    }
}

/// Convenience type alias for Results using SshmanError.
pub type Result<T> = std::result::Result<T, SshmanError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_alias_message_names_alias() {
        let err = SshmanError::DuplicateAlias("web".to_string());
        assert_eq!(err.to_string(), "a profile with alias 'web' already exists");
    }

    #[test]
    fn test_io_error_keeps_source() {
        let err: SshmanError = std::io::Error::other("disk gone").into();
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "disk gone");
    }

    #[test]
    fn test_is_authentication() {
        assert!(SshmanError::authentication("bad tag").is_authentication());
        assert!(!SshmanError::validation("bad host").is_authentication());
    }
}
