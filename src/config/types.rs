//! Configuration type definitions.

use knuffel::Decode;
use std::path::PathBuf;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_DECRYPTION_RETRIES: u32 = 1;

/// Setting names accepted by [`Config::set_default`] and [`Config::get_default`].
pub const SETTING_NAMES: &[&str] = &[
    "database_path",
    "log_path",
    "log_level",
    "mask_input",
    "decryption_retries",
];

/// Expand tilde (~) prefix to the user's home directory.
/// Handles both "~" alone and "~/path/to/something" patterns.
pub(crate) fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    PathBuf::from(path)
}

/// Main configuration structure parsed from sshman.kdl.
#[derive(Debug, Decode, Clone, Default)]
pub struct Config {
    #[knuffel(child)]
    pub defaults: Option<Defaults>,
}

/// Default settings for sshman.
#[derive(Debug, Decode, Clone, Default)]
pub struct Defaults {
    #[knuffel(property(name = "database_path"))]
    pub database_path: Option<String>,

    #[knuffel(property(name = "log_path"))]
    pub log_path: Option<String>,

    /// tracing filter directive, or "off" to disable the log file.
    #[knuffel(property(name = "log_level"))]
    pub log_level: Option<String>,

    #[knuffel(property(name = "mask_input"))]
    pub mask_input: Option<bool>,

    #[knuffel(property(name = "decryption_retries"))]
    pub decryption_retries: Option<u32>,
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|h| h.join(".local/share/sshman"))
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Config {
    /// Get the database path, defaulting to ~/.local/share/sshman/sshman.db
    pub fn db_path(&self) -> PathBuf {
        self.defaults
            .as_ref()
            .and_then(|d| d.database_path.as_deref())
            .map(expand_tilde)
            .unwrap_or_else(|| data_dir().join("sshman.db"))
    }

    /// Get the log file path, defaulting to ~/.local/share/sshman/sshman.log
    pub fn log_path(&self) -> PathBuf {
        self.defaults
            .as_ref()
            .and_then(|d| d.log_path.as_deref())
            .map(expand_tilde)
            .unwrap_or_else(|| data_dir().join("sshman.log"))
    }

    pub fn log_level(&self) -> String {
        self.defaults
            .as_ref()
            .and_then(|d| d.log_level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Whether secrets typed at prompts are hidden, defaulting to true
    pub fn mask_input(&self) -> bool {
        self.defaults
            .as_ref()
            .and_then(|d| d.mask_input)
            .unwrap_or(true)
    }

    /// Passphrase attempts per encrypted profile, at least 1
    pub fn decryption_retries(&self) -> u32 {
        self.defaults
            .as_ref()
            .and_then(|d| d.decryption_retries)
            .unwrap_or(DEFAULT_DECRYPTION_RETRIES)
            .max(1)
    }

    /// Update a default setting
    pub fn set_default(&mut self, key: &str, value: &str) -> Result<(), String> {
        let defaults = self.defaults.get_or_insert_with(Defaults::default);
        match key {
            "database_path" => defaults.database_path = Some(value.to_string()),
            "log_path" => defaults.log_path = Some(value.to_string()),
            "log_level" => defaults.log_level = Some(value.to_string()),
            "mask_input" => {
                defaults.mask_input =
                    Some(value.parse().map_err(|_| "mask_input must be true or false")?)
            }
            "decryption_retries" => {
                defaults.decryption_retries = Some(
                    value
                        .parse()
                        .map_err(|_| "Invalid number for decryption_retries")?,
                )
            }
            _ => {
                return Err(format!(
                    "Unknown setting: {}. Valid settings: {}",
                    key,
                    SETTING_NAMES.join(", ")
                ));
            }
        }
        Ok(())
    }

    /// Get the effective value of a setting as string
    pub fn get_default(&self, key: &str) -> Result<String, String> {
        match key {
            "database_path" => Ok(self.db_path().display().to_string()),
            "log_path" => Ok(self.log_path().display().to_string()),
            "log_level" => Ok(self.log_level()),
            "mask_input" => Ok(self.mask_input().to_string()),
            "decryption_retries" => Ok(self.decryption_retries().to_string()),
            _ => Err(format!(
                "Unknown setting: {}. Valid settings: {}",
                key,
                SETTING_NAMES.join(", ")
            )),
        }
    }
}
