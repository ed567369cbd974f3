//! Configuration key access and validation.
//!
//! Every `section.key` pair of `config.ini` is a [`ConfigKey`]. The INI
//! parser, the writer and the named get/set API all go through this table.

use std::path::PathBuf;
use std::str::FromStr;

use super::file::ConfigFileError;
use super::settings::ConfigFile;
use crate::cache::CacheDirMode;

/// Supported configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    SourceId,
    SourceUserFile,

    CacheDirectory,
    CacheMaxTiles,

    DownloadTimeout,
    DownloadProxy,
    DownloadGoogleCookie,

    ViewportDoublePixel,
    ViewportBorder,

    LoggingDirectory,
    LoggingFile,
}

impl FromStr for ConfigKey {
    type Err = ConfigFileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ConfigKey::all()
            .iter()
            .copied()
            .find(|key| key.name() == wanted)
            .ok_or_else(|| ConfigFileError::UnknownKey(s.to_string()))
    }
}

impl ConfigKey {
    /// Dotted name, e.g. `cache.directory`.
    pub fn name(&self) -> &'static str {
        match self {
            ConfigKey::SourceId => "source.id",
            ConfigKey::SourceUserFile => "source.user_file",
            ConfigKey::CacheDirectory => "cache.directory",
            ConfigKey::CacheMaxTiles => "cache.max_tiles",
            ConfigKey::DownloadTimeout => "download.timeout",
            ConfigKey::DownloadProxy => "download.proxy",
            ConfigKey::DownloadGoogleCookie => "download.google_cookie",
            ConfigKey::ViewportDoublePixel => "viewport.double_pixel",
            ConfigKey::ViewportBorder => "viewport.border",
            ConfigKey::LoggingDirectory => "logging.directory",
            ConfigKey::LoggingFile => "logging.file",
        }
    }

    /// INI section the key lives in.
    pub fn section(&self) -> &'static str {
        self.split().0
    }

    /// Key name within its section.
    pub fn key(&self) -> &'static str {
        self.split().1
    }

    fn split(&self) -> (&'static str, &'static str) {
        let name = self.name();
        name.split_once('.').unwrap_or((name, ""))
    }

    /// Current value as written to the INI file.
    pub fn get(&self, config: &ConfigFile) -> String {
        match self {
            ConfigKey::SourceId => config.source.id.to_string(),
            ConfigKey::SourceUserFile => config
                .source
                .user_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default(),
            ConfigKey::CacheDirectory => config.cache.directory.clone(),
            ConfigKey::CacheMaxTiles => config.cache.max_tiles.to_string(),
            ConfigKey::DownloadTimeout => config.download.timeout.to_string(),
            ConfigKey::DownloadProxy => config.download.proxy.clone().unwrap_or_default(),
            ConfigKey::DownloadGoogleCookie => {
                config.download.google_cookie.clone().unwrap_or_default()
            }
            ConfigKey::ViewportDoublePixel => config.viewport.double_pixel.to_string(),
            ConfigKey::ViewportBorder => config.viewport.border.to_string(),
            ConfigKey::LoggingDirectory => config.logging.directory.display().to_string(),
            ConfigKey::LoggingFile => config.logging.file.clone(),
        }
    }

    /// Validates and stores a value.
    pub fn set(&self, config: &mut ConfigFile, value: &str) -> Result<(), ConfigFileError> {
        let value = value.trim();
        match self {
            ConfigKey::SourceId => config.source.id = self.parse_number(value)?,
            ConfigKey::SourceUserFile => {
                config.source.user_file = optional_string(value).map(|p| expand_tilde(&p).into())
            }
            ConfigKey::CacheDirectory => {
                // Normalize through the mode parser so an empty value reads back as none://
                config.cache.directory = expand_mode_base(CacheDirMode::parse(value)).to_string();
            }
            ConfigKey::CacheMaxTiles => {
                let max: usize = self.parse_number(value)?;
                if max == 0 {
                    return Err(self.invalid(value, "must be at least 1"));
                }
                config.cache.max_tiles = max;
            }
            ConfigKey::DownloadTimeout => {
                let timeout: u64 = self.parse_number(value)?;
                if timeout == 0 {
                    return Err(self.invalid(value, "must be a positive integer (seconds)"));
                }
                config.download.timeout = timeout;
            }
            ConfigKey::DownloadProxy => config.download.proxy = optional_string(value),
            ConfigKey::DownloadGoogleCookie => {
                config.download.google_cookie = optional_string(value)
            }
            ConfigKey::ViewportDoublePixel => {
                config.viewport.double_pixel = parse_bool(value)
                    .ok_or_else(|| self.invalid(value, "must be true or false"))?;
            }
            ConfigKey::ViewportBorder => config.viewport.border = self.parse_number(value)?,
            ConfigKey::LoggingDirectory => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.logging.directory = expand_tilde(value).into();
            }
            ConfigKey::LoggingFile => {
                if value.is_empty() {
                    return Err(self.invalid(value, "must not be empty"));
                }
                config.logging.file = value.to_string();
            }
        }
        Ok(())
    }

    fn parse_number<T: FromStr>(&self, value: &str) -> Result<T, ConfigFileError> {
        value
            .parse()
            .map_err(|_| self.invalid(value, "must be a non-negative integer"))
    }

    fn invalid(&self, value: &str, reason: &str) -> ConfigFileError {
        ConfigFileError::InvalidValue {
            section: self.section().to_string(),
            key: self.key().to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Get all configuration keys.
    pub fn all() -> &'static [ConfigKey] {
        &[
            ConfigKey::SourceId,
            ConfigKey::SourceUserFile,
            ConfigKey::CacheDirectory,
            ConfigKey::CacheMaxTiles,
            ConfigKey::DownloadTimeout,
            ConfigKey::DownloadProxy,
            ConfigKey::DownloadGoogleCookie,
            ConfigKey::ViewportDoublePixel,
            ConfigKey::ViewportBorder,
            ConfigKey::LoggingDirectory,
            ConfigKey::LoggingFile,
        ]
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expand a leading `~` or `~/` to the home directory.
fn expand_tilde(value: &str) -> String {
    let rest = match value.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest.trim_start_matches('/'),
        _ => return value.to_string(),
    };
    match dirs::home_dir() {
        Some(home) if rest.is_empty() => home.display().to_string(),
        Some(home) => home.join(rest).display().to_string(),
        None => value.to_string(),
    }
}

/// Expand `~` in the base path of a parsed cache directory mode.
fn expand_mode_base(mode: CacheDirMode) -> CacheDirMode {
    let expand = |base: PathBuf| PathBuf::from(expand_tilde(&base.to_string_lossy()));
    match mode {
        CacheDirMode::Disabled => CacheDirMode::Disabled,
        CacheDirMode::Auto(base) => CacheDirMode::Auto(expand(base)),
        CacheDirMode::Friendly(base) => CacheDirMode::Friendly(expand(base)),
        CacheDirMode::Path(base) => CacheDirMode::Path(expand(base)),
    }
}

/// Convert empty string to None, non-empty to Some.
fn optional_string(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_roundtrips_its_name() {
        for key in ConfigKey::all() {
            assert_eq!(key.name().parse::<ConfigKey>().unwrap(), *key);
        }
    }

    #[test]
    fn test_names_are_case_insensitive() {
        assert_eq!(
            "Cache.Directory".parse::<ConfigKey>().unwrap(),
            ConfigKey::CacheDirectory
        );
    }

    #[test]
    fn test_unknown_key() {
        assert!(matches!(
            "cache.size".parse::<ConfigKey>(),
            Err(ConfigFileError::UnknownKey(_))
        ));
    }

    #[test]
    fn test_section_and_key() {
        assert_eq!(ConfigKey::DownloadGoogleCookie.section(), "download");
        assert_eq!(ConfigKey::DownloadGoogleCookie.key(), "google_cookie");
    }

    #[test]
    fn test_set_and_get() {
        let mut config = ConfigFile::default();
        ConfigKey::CacheMaxTiles.set(&mut config, "200").unwrap();
        ConfigKey::ViewportDoublePixel.set(&mut config, "yes").unwrap();
        ConfigKey::DownloadProxy.set(&mut config, "http://p:3128").unwrap();

        assert_eq!(ConfigKey::CacheMaxTiles.get(&config), "200");
        assert_eq!(ConfigKey::ViewportDoublePixel.get(&config), "true");
        assert_eq!(ConfigKey::DownloadProxy.get(&config), "http://p:3128");
    }

    #[test]
    fn test_user_file_is_optional_path() {
        let mut config = ConfigFile::default();
        assert_eq!(ConfigKey::SourceUserFile.get(&config), "");
        ConfigKey::SourceUserFile
            .set(&mut config, "/etc/tilecache/sources.json")
            .unwrap();
        assert_eq!(
            config.source.user_file,
            Some(std::path::PathBuf::from("/etc/tilecache/sources.json"))
        );
        ConfigKey::SourceUserFile.set(&mut config, "").unwrap();
        assert!(config.source.user_file.is_none());
    }

    #[test]
    fn test_empty_optional_clears() {
        let mut config = ConfigFile::default();
        ConfigKey::DownloadGoogleCookie.set(&mut config, "X=1").unwrap();
        ConfigKey::DownloadGoogleCookie.set(&mut config, "").unwrap();
        assert!(config.download.google_cookie.is_none());
    }

    #[test]
    fn test_cache_directory_is_normalized() {
        let mut config = ConfigFile::default();
        ConfigKey::CacheDirectory.set(&mut config, "").unwrap();
        assert_eq!(config.cache.directory, "none://");
        ConfigKey::CacheDirectory.set(&mut config, "auto:///var/maps").unwrap();
        assert_eq!(config.cache.directory, "auto:///var/maps");
    }

    #[test]
    fn test_invalid_values_name_section_and_key() {
        let mut config = ConfigFile::default();
        let err = ConfigKey::CacheMaxTiles.set(&mut config, "lots").unwrap_err();
        match err {
            ConfigFileError::InvalidValue { section, key, value, .. } => {
                assert_eq!(section, "cache");
                assert_eq!(key, "max_tiles");
                assert_eq!(value, "lots");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(ConfigKey::ViewportDoublePixel.set(&mut config, "maybe").is_err());
        assert!(ConfigKey::DownloadTimeout.set(&mut config, "0").is_err());
        assert!(ConfigKey::CacheMaxTiles.set(&mut config, "0").is_err());
    }

    #[test]
    fn test_expand_tilde() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_tilde("~/maps"), home.join("maps").display().to_string());
            assert_eq!(expand_tilde("~"), home.display().to_string());
        }
        assert_eq!(expand_tilde("/abs/maps"), "/abs/maps");
        assert_eq!(expand_tilde("~user/maps"), "~user/maps");
    }

    #[test]
    fn test_cache_directory_expands_home_after_scheme() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let mut config = ConfigFile::default();

        ConfigKey::CacheDirectory.set(&mut config, "friendly://~/tiles").unwrap();
        assert_eq!(
            config.cache.directory,
            format!("friendly://{}", home.join("tiles").display())
        );
        assert_eq!(
            config.cache_mode(),
            CacheDirMode::Friendly(home.join("tiles"))
        );

        ConfigKey::CacheDirectory.set(&mut config, "auto://~/tiles").unwrap();
        assert_eq!(config.cache_mode(), CacheDirMode::Auto(home.join("tiles")));

        ConfigKey::CacheDirectory.set(&mut config, "~/tiles").unwrap();
        assert_eq!(config.cache_mode(), CacheDirMode::Path(home.join("tiles")));
    }
}
