//! Fetch command - download one tile into the cache.

use std::path::PathBuf;
use std::time::Duration;

use tilecache::coord::to_tile_coords;
use tilecache::{RequestStatus, TileEvent};

use crate::error::CliError;
use crate::runner::{resolve_source, wait_for_downloads, write_file, CliRunner};

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub source: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub output: Option<PathBuf>,
    pub wait: Duration,
}

/// Run the fetch command.
pub fn run(runner: &CliRunner, args: FetchArgs) -> Result<(), CliError> {
    runner.log_startup("fetch");
    let config = runner.config();
    let runtime = runner.runtime()?;
    let mut engine = runner.create_engine(&runtime)?;
    let source = resolve_source(&mut engine, args.source.as_deref(), config)?;

    let tile = to_tile_coords(args.lat, args.lon, args.zoom)?;
    println!("Fetching tile for:");
    println!("  Location: {}, {}", args.lat, args.lon);
    println!("  Source: {}", source.name());
    println!("  Tile: {}", tile);
    println!();

    let (tx, events) = std::sync::mpsc::channel();
    engine.subscribe(move |event| {
        let _ = tx.send(event.clone());
    });

    let status = engine.request_tile(&source, tile.zoom, tile.x, tile.y);
    match status {
        RequestStatus::Cached => println!("Tile is already cached"),
        RequestStatus::Unavailable => {
            return Err(CliError::Config(format!(
                "{} does not serve zoom {}",
                source.name(),
                tile.zoom
            )))
        }
        _ => {
            let done = runtime.block_on(wait_for_downloads(&mut engine, args.wait));
            if !done {
                println!("Download still pending after {}s", args.wait.as_secs());
            }
        }
    }

    let received = events
        .try_iter()
        .filter(|e| matches!(e, TileEvent::Saved { .. } | TileEvent::Received { .. }))
        .count();
    if status != RequestStatus::Cached && received == 0 {
        println!("Tile could not be downloaded (see log for details)");
    }

    match engine.cached_tile_path(&source, tile.zoom, tile.x, tile.y) {
        Some(path) => {
            println!("Cached at {}", path.display());
            if let Some(output) = args.output {
                let data = std::fs::read(&path).map_err(|e| CliError::FileWrite {
                    path: output.display().to_string(),
                    error: e.to_string(),
                })?;
                write_file(&output, &data)?;
                println!("Copied to {}", output.display());
            }
        }
        None if !engine.config().cache_dir.is_enabled() => {
            println!("Disk cache is disabled; set cache.directory to keep tiles");
        }
        None => {}
    }

    Ok(())
}
