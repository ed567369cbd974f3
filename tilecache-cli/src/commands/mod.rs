//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`config`] - Configuration management (get, set, list, path)
//! - [`fetch`] - Single tile download into the cache
//! - [`prefetch`] - Region download over a zoom range
//! - [`render`] - Viewport rendering to a PNG
//! - [`sources`] - Tile source listing
//! - [`uri`] - Tile URI expansion

pub mod config;
pub mod fetch;
pub mod prefetch;
pub mod render;
pub mod sources;
pub mod uri;
