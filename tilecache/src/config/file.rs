//! Configuration file handling for ~/.tilecache/config.ini.
//!
//! Loads and saves user configuration with sensible defaults. Key names and
//! validation live in [`super::keys`].

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use super::keys::ConfigKey;
use super::settings::{config_file_path, ConfigFile};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Unknown configuration key
    #[error("Unknown configuration key '{0}'")]
    UnknownKey(String),

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(std::io::Error),
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilecache/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to the default path (~/.tilecache/config.ini).
    pub fn save(&self) -> Result<(), ConfigFileError> {
        self.save_to(&config_file_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        to_ini(self)
            .write_to_file(path)
            .map_err(|e| ConfigFileError::WriteError(e.to_string()))
    }

    /// Create the default config file if it doesn't exist.
    ///
    /// Returns the path to the config file.
    pub fn ensure_exists() -> Result<PathBuf, ConfigFileError> {
        let path = config_file_path();
        if !path.exists() {
            Self::default().save_to(&path)?;
        }
        Ok(path)
    }

    /// Reads a value by dotted name, e.g. `cache.directory`.
    pub fn get(&self, name: &str) -> Result<String, ConfigFileError> {
        let key: ConfigKey = name.parse()?;
        Ok(key.get(self))
    }

    /// Validates and stores a value by dotted name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ConfigFileError> {
        let key: ConfigKey = name.parse()?;
        key.set(self, value)
    }
}

/// Overlay the values found in `ini` on the defaults.
fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();
    for key in ConfigKey::all() {
        if let Some(value) = ini.get_from(Some(key.section()), key.key()) {
            key.set(&mut config, value)?;
        }
    }
    Ok(config)
}

fn to_ini(config: &ConfigFile) -> Ini {
    let mut ini = Ini::new();
    for key in ConfigKey::all() {
        ini.with_section(Some(key.section()))
            .set(key.key(), key.get(config));
    }
    ini
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::settings::DEFAULT_MAX_TILES;
    use tempfile::TempDir;

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigFile::load_from(&temp_dir.path().join("nonexistent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_partial_file_overlays_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[source]\nid = 17\n\n[viewport]\ndouble_pixel = on\nborder = 64\n",
        )
        .unwrap();

        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.source.id, 17);
        assert!(config.viewport.double_pixel);
        assert_eq!(config.viewport.border, 64);
        assert_eq!(config.cache.max_tiles, DEFAULT_MAX_TILES);
    }

    #[test]
    fn test_invalid_value_in_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.ini");
        std::fs::write(&path, "[download]\ntimeout = soon\n").unwrap();

        let result = ConfigFile::load_from(&path);
        assert!(matches!(
            result,
            Err(ConfigFileError::InvalidValue { ref section, .. }) if section == "download"
        ));
    }

    #[test]
    fn test_save_and_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/config.ini");

        let mut config = ConfigFile::default();
        config.set("cache.directory", "auto:///srv/tiles").unwrap();
        config.set("download.proxy", "http://proxy:3128").unwrap();
        config.set("cache.max_tiles", "96").unwrap();
        config.save_to(&path).unwrap();

        let loaded = ConfigFile::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.get("cache.directory").unwrap(), "auto:///srv/tiles");
    }

    #[test]
    fn test_get_unknown_key() {
        let config = ConfigFile::default();
        assert!(matches!(
            config.get("nope.nothing"),
            Err(ConfigFileError::UnknownKey(_))
        ));
    }
}
