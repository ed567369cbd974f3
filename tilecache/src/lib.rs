//! tilecache - slippy-map tile acquisition and caching
//!
//! Fetches map tiles from a registry of tile servers, keeps them in a
//! filesystem cache and a generational in-memory cache, and composes the
//! tiles covering a viewport, upscaling coarser tiles where the exact ones
//! are not available yet.
//!
//! [`TileEngine`] ties the pieces together:
//!
//! - [`source`]: tile server registry and URI templating
//! - [`cache`]: disk and memory caches
//! - [`download`]: HTTP client and download dispatcher
//! - [`fallback`]: ancestor-tile upscaling
//! - [`compositor`]: viewport rendering
//! - [`config`] and [`logging`]: host-side setup

pub mod cache;
pub mod codec;
pub mod compositor;
pub mod config;
pub mod coord;
pub mod download;
pub mod engine;
pub mod events;
pub mod fallback;
pub mod logging;
pub mod source;

pub use compositor::Viewport;
pub use coord::TileCoord;
pub use download::{AsyncHttpClient, ReqwestClient, RequestStatus};
pub use engine::{EngineConfig, EngineError, TileEngine};
pub use events::TileEvent;
pub use source::{Source, SourceDescriptor, SourceId, SourceRegistry};
