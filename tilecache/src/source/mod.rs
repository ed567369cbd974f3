//! Tile sources
//!
//! A [`Source`] describes one tile server: where tiles come from, how they
//! are named on disk and how long they stay fresh. The [`SourceRegistry`]
//! hands out shared sources by id or name, and [`build_uri`] expands a
//! source's URI template for a tile.

mod presets;
mod registry;
mod types;
mod uri;

pub use presets::{preset, Preset, PresetId};
pub use registry::SourceRegistry;
pub use types::{
    CachePolicy, Source, SourceDescriptor, SourceError, SourceId, UriFormat, UriToken,
    DEFAULT_CACHE_PERIOD_SECS, USER_DEFINED_ID_BASE,
};
pub use uri::{build_uri, build_uri_with, RandomShardPicker, ShardPicker};
