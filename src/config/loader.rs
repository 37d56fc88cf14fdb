//! Configuration file loading and generation.

use std::path::{Path, PathBuf};

use super::types::{Config, SETTING_NAMES};
use crate::error::{Result, SshmanError};

const CONFIG_FILE_NAME: &str = "sshman.kdl";

impl Config {
    /// Get the explicit ~/.config/sshman/sshman.kdl path (XDG-style, cross-platform)
    fn xdg_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".config/sshman").join(CONFIG_FILE_NAME))
    }

    /// Get the list of config file search paths in priority order
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];

        if let Some(xdg_path) = Self::xdg_config_path() {
            paths.push(xdg_path);
        }

        // Platform-native config directory, skipped when identical to the XDG path
        if let Some(config_dir) = dirs::config_dir() {
            let native_path = config_dir.join("sshman").join(CONFIG_FILE_NAME);
            if Self::xdg_config_path().as_ref() != Some(&native_path) {
                paths.push(native_path);
            }
        }

        paths
    }

    /// Get the default config path (~/.config/sshman/sshman.kdl)
    pub fn default_config_path() -> PathBuf {
        Self::xdg_config_path().unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
    }

    /// Find existing config file by searching all standard locations
    pub fn find_existing_config() -> Option<PathBuf> {
        Self::search_paths().into_iter().find(|path| path.exists())
    }

    /// Parse configuration from KDL text
    pub fn parse(file_name: &str, content: &str) -> Result<Self> {
        knuffel::parse::<Config>(file_name, content).map_err(|e| SshmanError::config(e.to_string()))
    }

    fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SshmanError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&path.display().to_string(), &content)
    }

    /// Load configuration. An explicit path must exist; otherwise the search
    /// paths are tried in order and a missing file means defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from_path(path);
        }

        match Self::find_existing_config() {
            Some(path) => Self::load_from_path(&path),
            None => Ok(Config::default()),
        }
    }

    /// Generate a config file with default values
    pub fn generate_config_file(path: Option<PathBuf>, overwrite: bool) -> Result<PathBuf> {
        let config_path = path.unwrap_or_else(Self::default_config_path);

        if config_path.exists() && !overwrite {
            return Err(SshmanError::config(format!(
                "config file already exists at: {}. Use --overwrite to replace it.",
                config_path.display()
            )));
        }

        if let Some(parent) = config_path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)?;
        }

        let kdl_content = r#"// sshman configuration
// database_path and log_path accept ~ for the home directory.
// log_level takes a tracing filter such as "info" or "sshman=debug", or "off".
// decryption_retries is the number of passphrase attempts per encrypted profile.
defaults database_path="~/.local/share/sshman/sshman.db" log_path="~/.local/share/sshman/sshman.log" log_level="info" mask_input=true decryption_retries=1
"#;

        std::fs::write(&config_path, kdl_content)?;
        Ok(config_path)
    }

    /// Serialize the effective settings to KDL
    pub fn to_kdl(&self) -> String {
        let mut output = String::from("defaults");
        for key in SETTING_NAMES {
            // get_default only fails for unknown keys
            if let Ok(value) = self.get_default(key) {
                match *key {
                    "mask_input" | "decryption_retries" => {
                        output.push_str(&format!(" {}={}", key, value))
                    }
                    _ => output.push_str(&format!(" {}={:?}", key, value)),
                }
            }
        }
        output.push('\n');
        output
    }
}
