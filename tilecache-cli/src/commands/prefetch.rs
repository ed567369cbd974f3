//! Prefetch command - download every tile of a region over a zoom range.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use crate::error::CliError;
use crate::runner::{resolve_source, CliRunner};

/// Arguments for the prefetch command.
pub struct PrefetchArgs {
    pub source: Option<String>,
    pub north: f64,
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub min_zoom: u8,
    pub max_zoom: u8,
    pub wait: Duration,
}

/// Run the prefetch command.
pub fn run(runner: &CliRunner, args: PrefetchArgs) -> Result<(), CliError> {
    runner.log_startup("prefetch");
    let config = runner.config();
    if !config.cache_mode().is_enabled() {
        return Err(CliError::Config(
            "Prefetching needs a disk cache; set cache.directory first".to_string(),
        ));
    }
    if args.min_zoom > args.max_zoom {
        return Err(CliError::Config(format!(
            "--min-zoom {} is above --max-zoom {}",
            args.min_zoom, args.max_zoom
        )));
    }

    let runtime = runner.runtime()?;
    let mut engine = runner.create_engine(&runtime)?;
    let source = resolve_source(&mut engine, args.source.as_deref(), config)?;

    let queued = engine.download_region(
        &source,
        (args.north, args.west),
        (args.south, args.east),
        args.min_zoom,
        args.max_zoom,
    )?;
    println!(
        "Queued {} tiles from {} (zoom {}-{})",
        queued,
        source.name(),
        args.min_zoom.max(source.min_zoom()),
        args.max_zoom.min(source.max_zoom())
    );
    if queued == 0 {
        return Ok(());
    }

    let progress = ProgressBar::new(queued as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} tiles ({eta})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let finished = runtime.block_on(async {
        let work = async {
            while engine.tiles_queued() > 0 {
                if !engine.next_completion().await {
                    break;
                }
                progress.set_position(queued.saturating_sub(engine.tiles_queued()) as u64);
            }
        };
        tokio::time::timeout(args.wait, work).await.is_ok()
    });

    if finished {
        progress.finish_with_message("done");
        info!(queued, "Prefetch complete");
        println!("Prefetch complete");
    } else {
        progress.abandon();
        println!(
            "Stopped after {}s with {} downloads pending",
            args.wait.as_secs(),
            engine.tiles_queued()
        );
    }

    Ok(())
}
