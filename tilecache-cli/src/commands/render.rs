//! Render command - compose the map around a point into a PNG.

use std::path::PathBuf;
use std::time::Duration;

use tilecache::coord::to_world_pixel;
use tracing::info;

use crate::error::CliError;
use crate::runner::{resolve_source, wait_for_downloads, CliRunner};

/// Arguments for the render command.
pub struct RenderArgs {
    pub source: Option<String>,
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub double_pixel: bool,
    pub output: PathBuf,
    pub wait: Duration,
}

/// Run the render command.
///
/// Renders once to queue the missing tiles, waits for them, then renders
/// again if any arrived.
pub fn run(runner: &CliRunner, args: RenderArgs) -> Result<(), CliError> {
    runner.log_startup("render");
    let config = runner.config();
    let runtime = runner.runtime()?;
    let mut engine = runner.create_engine(&runtime)?;
    let source = resolve_source(&mut engine, args.source.as_deref(), config)?;

    let (center_x, center_y) = to_world_pixel(args.lat, args.lon, args.zoom)?;
    let mut viewport = engine.viewport(
        center_x - i64::from(args.width / 2),
        center_y - i64::from(args.height / 2),
        args.width,
        args.height,
        args.zoom,
    );
    viewport.double_pixel |= args.double_pixel;

    let mut surface = engine.render_viewport(&source, &viewport)?;
    if engine.tiles_queued() > 0 {
        println!("Waiting for {} tiles...", engine.tiles_queued());
        runtime.block_on(wait_for_downloads(&mut engine, args.wait));
        if engine.take_redraw() {
            surface = engine.render_viewport(&source, &viewport)?;
        }
    }

    surface
        .save(&args.output)
        .map_err(|e| CliError::FileWrite {
            path: args.output.display().to_string(),
            error: e.to_string(),
        })?;

    info!(path = %args.output.display(), "Viewport rendered");
    println!(
        "Rendered {}x{} from {} to {}",
        args.width,
        args.height,
        source.name(),
        args.output.display()
    );
    if let (Some(notice), _) = source.copyright() {
        println!("  {}", notice);
    }

    Ok(())
}
