//! Disk cache for encoded tile bytes.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use thiserror::Error;
use tracing::{debug, trace, warn};

use super::dir::{build_cache_path, CacheDirMode};
use crate::source::{CachePolicy, Source};

/// Disk cache errors.
#[derive(Debug, Error)]
pub enum DiskCacheError {
    /// Parent directory could not be created
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Tile file could not be written
    #[error("Failed to write tile {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Write-through store of downloaded tiles.
///
/// Files live at `<cache_root>/<zoom>/<x>/<y>.<format>`; the root of each
/// source comes from the configured [`CacheDirMode`].
#[derive(Debug, Clone, Default)]
pub struct DiskCache {
    mode: CacheDirMode,
}

impl DiskCache {
    /// Create a disk cache for the given directory mode.
    pub fn new(mode: CacheDirMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> &CacheDirMode {
        &self.mode
    }

    pub fn is_enabled(&self) -> bool {
        self.mode.is_enabled()
    }

    /// Root directory of a source's tiles, if caching is enabled.
    pub fn root_for(&self, source: &Source) -> Option<PathBuf> {
        self.mode.cache_root(source)
    }

    /// Full path of a tile file, if caching is enabled.
    pub fn tile_path(&self, source: &Source, zoom: u8, x: u32, y: u32) -> Option<PathBuf> {
        self.root_for(source)
            .map(|root| build_cache_path(&root, source.image_format(), zoom, x, y))
    }

    /// Read a cached tile.
    ///
    /// Returns `None` if the file is missing or unreadable.
    pub fn read(&self, path: &Path) -> Option<Vec<u8>> {
        match fs::read(path) {
            Ok(data) => {
                trace!(path = %path.display(), bytes = data.len(), "Disk cache hit");
                Some(data)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Disk cache read failed");
                None
            }
        }
    }

    /// Write a tile, creating parent directories as needed.
    pub fn write(&self, path: &Path, data: &[u8]) -> Result<(), DiskCacheError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| DiskCacheError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        fs::write(path, data).map_err(|source| DiskCacheError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        trace!(path = %path.display(), bytes = data.len(), "Tile written to disk cache");
        Ok(())
    }

    /// Whether a cached file has outlived its TTL.
    ///
    /// Always `false` for [`CachePolicy::NeverExpire`] and for missing files.
    pub fn is_stale(&self, path: &Path, ttl: Duration, policy: CachePolicy) -> bool {
        if policy == CachePolicy::NeverExpire {
            return false;
        }

        let modified = match fs::metadata(path).and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Cannot read tile mtime");
                }
                return false;
            }
        };

        // An mtime in the future counts as fresh
        SystemTime::now()
            .duration_since(modified)
            .map(|age| age > ttl)
            .unwrap_or(false)
    }

    /// Whether a cached file exists and is still usable under its source's policy.
    pub fn is_fresh(&self, path: &Path, source: &Source) -> bool {
        path.is_file() && !self.is_stale(path, source.cache_period(), source.cache_policy())
    }
}
