//! File logging for sshman.
//!
//! Events are written as JSON lines to the configured log file. Every
//! top-level command runs inside a span carrying a `session_id`, so all
//! lines of one invocation can be correlated. When logging is off no
//! subscriber is installed and all `tracing` macros are no-ops.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::Config;

/// Environment variable that overrides the configured level.
pub const LOG_ENV_VAR: &str = "SSHMAN_LOG";

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub path: PathBuf,
    /// Filter directive (trace, debug, info, warn, error, or off).
    pub level: String,
}

impl LogConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            path: config.log_path(),
            level: config.log_level(),
        }
    }

    /// Logging is off when neither the env override nor the config asks for it.
    pub fn enabled(&self) -> bool {
        match std::env::var(LOG_ENV_VAR) {
            Ok(v) if !v.trim().is_empty() => !is_off(&v),
            _ => !is_off(&self.level),
        }
    }
}

fn is_off(level: &str) -> bool {
    matches!(
        level.trim().to_lowercase().as_str(),
        "off" | "none" | "disabled"
    )
}

/// Initializes the logging system. Returns whether a subscriber was installed.
pub fn init(config: &LogConfig) -> io::Result<bool> {
    if !config.enabled() {
        return Ok(false);
    }

    if let Some(parent) = config.path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.path)?;
    let _ = crate::utils::restrict_file_permissions(&config.path);

    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init()
        .map_err(io::Error::other)?;

    tracing::debug!(path = %config.path.display(), level = %config.level, "logging initialized");
    Ok(true)
}

/// Identifier shared by every log line of one command invocation.
pub fn new_session_id(command: &str) -> String {
    format!("{}_{}", command, uuid::Uuid::new_v4().simple())
}

/// Span wrapping one top-level command.
pub fn command_span(command: &'static str) -> tracing::Span {
    let session_id = new_session_id(command);
    tracing::info_span!("command", command, session_id = %session_id)
}
