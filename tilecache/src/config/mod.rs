//! User configuration.
//!
//! `~/.tilecache/config.ini` holds the handful of named values the engine
//! and its host need: the active source, cache directory and size, download
//! options, viewport options and logging location.
//!
//! # Example
//!
//! ```
//! use tilecache::config::ConfigFile;
//!
//! let mut config = ConfigFile::default();
//! config.set("cache.max_tiles", "96").unwrap();
//! assert_eq!(config.get("cache.max_tiles").unwrap(), "96");
//! ```

mod file;
mod keys;
mod settings;

pub use file::ConfigFileError;
pub use keys::ConfigKey;
pub use settings::{
    config_directory, config_file_path, default_cache_directory, CacheSettings, ConfigFile,
    DownloadSettings, LoggingSettings, SourceSettings, ViewportSettings, DEFAULT_LOG_FILE,
    DEFAULT_MAX_TILES, DEFAULT_SOURCE_ID,
};
