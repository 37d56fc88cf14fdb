//! sshman - a CLI tool and library for managing SSH connection profiles.
//!
//! This crate provides functionality to:
//! - Store SSH profiles (host, user, password or private key) in SQLite
//! - Seal secrets with a passphrase-derived AES-256-GCM key
//! - Open interactive shells with an optional startup command
//! - Copy files to and from a profile's host
//! - Export and import profiles as CSV
//!
//! # Example
//!
//! ```no_run
//! use sshman::{Config, ProfileRepository, init_db};
//!
//! fn main() -> sshman::Result<()> {
//!     let config = Config::load(None)?;
//!     let repo = ProfileRepository::new(init_db(&config.db_path())?);
//!
//!     for profile in repo.get_all()? {
//!         println!("{}", profile.summary());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod credentials;
pub mod crypto;
pub mod db;
pub mod error;
pub mod logging;
pub mod session;
pub mod transfer;
pub mod utils;

// Re-export commonly used types at the crate root
pub use config::Config;
pub use db::{AuthType, Credential, Profile, ProfileInput, ProfileRepository, init_db};
pub use error::{Result, SshmanError};
