//! Two-tier tile cache.
//!
//! Encoded tiles persist on disk under a per-source root; decoded surfaces
//! live in a memory cache that is purged by generation once per redraw.

mod dir;
mod disk;
mod memory;
mod stats;

pub use dir::{build_cache_path, relative_tile_id, CacheDirMode};
pub use disk::{DiskCache, DiskCacheError};
pub use memory::{CachedTile, MemoryCache};
pub use stats::CacheStats;
