//! Database model structs representing table rows.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::error::{Result, SshmanError};

/// How a profile authenticates against its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    Password,
    PrivateKey,
}

impl AuthType {
    /// Human-readable name, also used in CSV exports.
    pub fn name(&self) -> &'static str {
        match self {
            AuthType::Password => "Password",
            AuthType::PrivateKey => "Private Key",
        }
    }

    /// Parse the name written by [`AuthType::name`].
    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim() {
            "Password" => Ok(AuthType::Password),
            "Private Key" => Ok(AuthType::PrivateKey),
            other => Err(SshmanError::validation(format!(
                "{} is not a valid authentication type",
                other
            ))),
        }
    }

    pub(crate) fn as_i64(&self) -> i64 {
        match self {
            AuthType::Password => 0,
            AuthType::PrivateKey => 1,
        }
    }

    pub(crate) fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(AuthType::Password),
            1 => Some(AuthType::PrivateKey),
            _ => None,
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The active secret of a profile. Plaintext or hex ciphertext, depending on
/// the profile's `encrypted` flag.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    Password(String),
    PrivateKey(Vec<u8>),
}

impl Credential {
    pub fn auth_type(&self) -> AuthType {
        match self {
            Credential::Password(_) => AuthType::Password,
            Credential::PrivateKey(_) => AuthType::PrivateKey,
        }
    }

    /// The secret as raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Credential::Password(p) => p.as_bytes(),
            Credential::PrivateKey(k) => k,
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Password(_) => f.write_str("Password(..)"),
            Credential::PrivateKey(_) => f.write_str("PrivateKey(..)"),
        }
    }
}

/// A stored SSH connection profile.
#[derive(Debug, Clone)]
pub struct Profile {
    pub id: i64,
    pub alias: String,
    pub host: String,
    pub user: String,
    pub credential: Credential,
    pub encrypted: bool,
    pub startup_command: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Profile {
    pub fn auth_type(&self) -> AuthType {
        self.credential.auth_type()
    }

    /// One-line summary used by pickers: `id alias user@host (auth)`.
    pub fn summary(&self) -> String {
        format!(
            "{} {} {}@{} ({})",
            self.id,
            self.alias,
            self.user,
            self.host,
            self.auth_type()
        )
    }

    /// Convert back into an input record, e.g. to persist an edited copy.
    pub fn to_input(&self) -> ProfileInput {
        ProfileInput {
            alias: self.alias.clone(),
            host: self.host.clone(),
            user: self.user.clone(),
            credential: self.credential.clone(),
            encrypted: self.encrypted,
            startup_command: self.startup_command.clone(),
            created_at: Some(self.created_at),
        }
    }
}

/// Input for creating/updating a profile (without auto-generated fields).
#[derive(Debug, Clone)]
pub struct ProfileInput {
    pub alias: String,
    pub host: String,
    pub user: String,
    pub credential: Credential,
    pub encrypted: bool,
    pub startup_command: String,
    /// Creation time to keep (imports). `None` means now.
    pub created_at: Option<DateTime<Utc>>,
}
