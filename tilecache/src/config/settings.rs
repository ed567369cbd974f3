//! Settings structs and their defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::cache::CacheDirMode;
use crate::download::{resolve_google_cookie, HttpConfig, DEFAULT_TIMEOUT_SECS};
use crate::engine::EngineConfig;
use crate::source::SourceId;

/// OpenStreetMap.
pub const DEFAULT_SOURCE_ID: u32 = 1;

/// Decoded tiles kept in memory before a purge is considered.
pub const DEFAULT_MAX_TILES: usize = 48;

pub const DEFAULT_LOG_FILE: &str = "tilecache.log";

/// Get the path to the config directory (~/.tilecache).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilecache")
}

/// Get the path to the config file (~/.tilecache/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Default cache directory setting: friendly names under the user cache dir.
pub fn default_cache_directory() -> String {
    let base = dirs::cache_dir()
        .unwrap_or_else(|| config_directory().join("cache"))
        .join("tilecache");
    format!("friendly://{}", base.display())
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub id: u32,
    /// JSON array of user-defined source descriptors
    pub user_file: Option<PathBuf>,
}

/// `[cache]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Cache directory mode string (`none://`, `auto://...`, `friendly://...` or a path)
    pub directory: String,
    pub max_tiles: usize,
}

/// `[download]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadSettings {
    /// Request timeout in seconds
    pub timeout: u64,
    pub proxy: Option<String>,
    pub google_cookie: Option<String>,
}

/// `[viewport]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportSettings {
    pub double_pixel: bool,
    /// Extra pixels loaded around the viewport
    pub border: u32,
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    pub directory: PathBuf,
    pub file: String,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub cache: CacheSettings,
    pub download: DownloadSettings,
    pub viewport: ViewportSettings,
    pub logging: LoggingSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            source: SourceSettings {
                id: DEFAULT_SOURCE_ID,
                user_file: None,
            },
            cache: CacheSettings {
                directory: default_cache_directory(),
                max_tiles: DEFAULT_MAX_TILES,
            },
            download: DownloadSettings {
                timeout: DEFAULT_TIMEOUT_SECS,
                proxy: None,
                google_cookie: None,
            },
            viewport: ViewportSettings {
                double_pixel: false,
                border: 0,
            },
            logging: LoggingSettings {
                directory: config_directory().join("logs"),
                file: DEFAULT_LOG_FILE.to_string(),
            },
        }
    }
}

impl ConfigFile {
    pub fn source_id(&self) -> SourceId {
        SourceId(self.source.id)
    }

    pub fn cache_mode(&self) -> CacheDirMode {
        CacheDirMode::parse(&self.cache.directory)
    }

    /// HTTP client options from the `[download]` section.
    pub fn http_config(&self) -> HttpConfig {
        HttpConfig {
            timeout: Duration::from_secs(self.download.timeout),
            proxy: self.download.proxy.clone(),
            ..HttpConfig::default()
        }
    }

    /// Engine options, resolving the Google cookie against the environment.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            cache_dir: self.cache_mode(),
            max_tiles: self.cache.max_tiles,
            google_cookie: resolve_google_cookie(self.download.google_cookie.as_deref()),
            border: self.viewport.border,
            double_pixel: self.viewport.double_pixel,
        }
    }
}
