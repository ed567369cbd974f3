//! Uri command - expand a source's URI template for one tile.

use tilecache::coord::TileCoord;
use tilecache::source::{build_uri, SourceId, SourceRegistry};

use crate::error::CliError;

/// Arguments for the uri command.
pub struct UriArgs {
    pub source: String,
    pub zoom: u8,
    pub x: u32,
    pub y: u32,
}

/// Run the uri command.
pub fn run(args: UriArgs) -> Result<(), CliError> {
    let mut registry = SourceRegistry::new();
    let source = match args.source.parse::<u32>() {
        Ok(id) => registry.get_by_id(SourceId(id))?,
        Err(_) => registry.get_by_name(&args.source)?,
    };

    if !TileCoord::new(args.zoom, args.x, args.y).is_in_range() {
        return Err(CliError::Config(format!(
            "Tile {}/{}/{} does not exist",
            args.zoom, args.x, args.y
        )));
    }

    match build_uri(&source, args.zoom, args.x, args.y) {
        Some(uri) => {
            println!("{}", uri);
            Ok(())
        }
        None => Err(CliError::Config(format!(
            "Source '{}' has no tile server",
            source.name()
        ))),
    }
}
