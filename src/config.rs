use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::engine::EngineOptions;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_preferences_path")]
    pub preferences_path: String,
    #[serde(default = "default_username")]
    pub default_username: String,
    #[serde(default = "default_replacement_username")]
    pub replacement_username: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            preferences_path: default_preferences_path(),
            default_username: default_username(),
            replacement_username: default_replacement_username(),
            log_level: default_log_level(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

// Default value functions
fn default_database_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::data_file_for_profile(utils::Profile::Prod, "tasks.db")
}

fn default_preferences_path() -> String {
    Config::data_file_for_profile(utils::Profile::Prod, "preferences.toml")
}

fn default_username() -> String {
    "Default User".to_string()
}

fn default_replacement_username() -> String {
    "New User".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine config and data paths
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;

        if config_path.exists() {
            let contents = fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;

            // Keep data files inside the profile's directory (in case config was manually edited)
            config.database_path = Self::data_file_for_profile(profile, "tasks.db");
            config.preferences_path = Self::data_file_for_profile(profile, "preferences.toml");

            Ok(config)
        } else {
            let mut config = Config::default();
            config.database_path = Self::data_file_for_profile(profile, "tasks.db");
            config.preferences_path = Self::data_file_for_profile(profile, "preferences.toml");
            config.save_to(&config_path)?;
            Ok(config)
        }
    }

    /// Load configuration from an explicit file; missing keys take their defaults.
    /// A missing file is created with defaults.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            Ok(toml::from_str(&contents)?)
        } else {
            let mut config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    /// Save configuration to `path`
    pub fn save_to(&mut self, path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError(e.to_string()))?;
            }
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string).map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Path of a data file for a specific profile
    fn data_file_for_profile(profile: utils::Profile, file_name: &str) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join(file_name).to_string_lossy().to_string()
        } else {
            // Fallback paths - platform-specific
            #[cfg(target_os = "macos")]
            {
                match profile {
                    utils::Profile::Dev => format!("~/Library/Application Support/tasktrack-dev/{file_name}"),
                    utils::Profile::Prod => format!("~/Library/Application Support/tasktrack/{file_name}"),
                }
            }
            #[cfg(not(target_os = "macos"))]
            {
                match profile {
                    utils::Profile::Dev => format!("~/.local/share/tasktrack-dev/{file_name}"),
                    utils::Profile::Prod => format!("~/.local/share/tasktrack/{file_name}"),
                }
            }
        }
    }

    /// Get the expanded database path (with ~ expansion)
    pub fn get_database_path(&self) -> PathBuf {
        utils::expand_path(&self.database_path)
    }

    /// Get the expanded preferences path (with ~ expansion)
    pub fn get_preferences_path(&self) -> PathBuf {
        utils::expand_path(&self.preferences_path)
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            default_username: self.default_username.clone(),
            replacement_username: self.replacement_username.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("conf").join("config.toml");

        let config = Config::load_from_path(&path).expect("load");
        assert!(path.exists());
        assert_eq!(config.default_username, "Default User");
        assert_eq!(config.replacement_username, "New User");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.config_version, Some(CURRENT_CONFIG_VERSION));
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
database_path = "/tmp/elsewhere/tasks.db"
default_username = "Me"
"#,
        )
        .expect("write");

        let config = Config::load_from_path(&path).expect("load");
        assert_eq!(config.database_path, "/tmp/elsewhere/tasks.db");
        assert_eq!(config.default_username, "Me");
        assert_eq!(config.replacement_username, "New User");

        let options = config.engine_options();
        assert_eq!(options.default_username, "Me");
    }

    #[test]
    fn invalid_toml_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        fs::write(&path, "this = [not valid").expect("write");

        assert!(matches!(Config::load_from_path(&path), Err(ConfigError::ParseError(_))));
    }
}
