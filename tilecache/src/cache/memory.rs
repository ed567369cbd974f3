//! In-memory cache of decoded tiles with generational eviction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::stats::CacheStats;
use crate::codec::TileImage;

/// Entry in the memory cache.
#[derive(Debug, Clone)]
pub struct CachedTile {
    /// Decoded surface
    pub image: TileImage,
    /// Generation in which the tile was last used
    pub last_touched: u64,
}

/// Decoded tiles keyed by their disk path (or relative tile id).
///
/// Every lookup stamps the entry with the current generation. Once per
/// redraw, after all visible tiles have been looked up,
/// [`purge_if_oversized`](Self::purge_if_oversized) drops everything the
/// redraw did not touch.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<PathBuf, CachedTile>,
    generation: u64,
    stats: CacheStats,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new generation and returns it.
    pub fn begin_generation(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Get a tile, stamping it with the current generation.
    pub fn get(&mut self, path: &Path) -> Option<TileImage> {
        match self.entries.get_mut(path) {
            Some(entry) => {
                entry.last_touched = self.generation;
                self.stats.record_memory_hit();
                Some(TileImage::clone(&entry.image))
            }
            None => {
                self.stats.record_memory_miss();
                None
            }
        }
    }

    /// Whether a tile is cached, without touching it.
    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// Insert or replace a tile in the current generation.
    pub fn put(&mut self, path: impl Into<PathBuf>, image: TileImage) {
        self.entries.insert(
            path.into(),
            CachedTile {
                image,
                last_touched: self.generation,
            },
        );
        self.stats.memory_entry_count = self.entries.len();
    }

    /// Evicts every entry not touched in the current generation once the
    /// cache holds `max_entries` or more. Returns the number removed.
    pub fn purge_if_oversized(&mut self, max_entries: usize) -> usize {
        if self.entries.len() < max_entries {
            return 0;
        }

        let before = self.entries.len();
        let generation = self.generation;
        self.entries.retain(|_, tile| tile.last_touched == generation);
        let removed = before - self.entries.len();

        self.stats.record_memory_evictions(removed as u64);
        self.stats.memory_entry_count = self.entries.len();
        debug!(
            generation,
            removed,
            remaining = self.entries.len(),
            "Purged memory cache"
        );
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }
}
