//! tilecache CLI - Command-line interface
//!
//! This binary provides a command-line interface to the tilecache library:
//! listing sources, fetching and prefetching tiles into the disk cache and
//! rendering viewports to PNG files.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use commands::config::ConfigCommands;
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "tilecache")]
#[command(version, about = "Fetch, cache and composite slippy map tiles", long_about = None)]
struct Cli {
    /// Config file to use instead of ~/.tilecache/config.ini
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List tile sources
    Sources {
        /// Include inactive and retired sources
        #[arg(long)]
        all: bool,
    },

    /// Print the download URI of a tile
    Uri {
        /// Source id or name
        source: String,
        zoom: u8,
        x: u32,
        y: u32,
    },

    /// Download one tile into the cache
    Fetch {
        /// Source id or name (defaults to source.id from config)
        #[arg(long)]
        source: Option<String>,

        /// Latitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        /// Zoom level
        #[arg(long, default_value = "12")]
        zoom: u8,

        /// Also copy the tile to this file
        #[arg(long)]
        output: Option<PathBuf>,

        /// Seconds to wait for the download
        #[arg(long, default_value = "60")]
        wait: u64,
    },

    /// Download every tile of a region
    Prefetch {
        /// Source id or name (defaults to source.id from config)
        #[arg(long)]
        source: Option<String>,

        /// Northern latitude of the region
        #[arg(long, allow_hyphen_values = true)]
        north: f64,

        /// Western longitude of the region
        #[arg(long, allow_hyphen_values = true)]
        west: f64,

        /// Southern latitude of the region
        #[arg(long, allow_hyphen_values = true)]
        south: f64,

        /// Eastern longitude of the region
        #[arg(long, allow_hyphen_values = true)]
        east: f64,

        #[arg(long, default_value = "1")]
        min_zoom: u8,

        #[arg(long, default_value = "12")]
        max_zoom: u8,

        /// Seconds to wait for all downloads
        #[arg(long, default_value = "600")]
        wait: u64,
    },

    /// Render the map around a point to a PNG file
    Render {
        /// Source id or name (defaults to source.id from config)
        #[arg(long)]
        source: Option<String>,

        /// Latitude of the center in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        /// Longitude of the center in decimal degrees
        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, default_value = "12")]
        zoom: u8,

        #[arg(long, default_value = "800")]
        width: u32,

        #[arg(long, default_value = "600")]
        height: u32,

        /// Draw tiles from one zoom coarser at twice their size
        #[arg(long)]
        double_pixel: bool,

        /// Output PNG path
        #[arg(long, short)]
        output: PathBuf,

        /// Seconds to wait for missing tiles
        #[arg(long, default_value = "30")]
        wait: u64,
    },

    /// View and modify configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Sources { all } => commands::sources::run(all, config_path),
        Commands::Uri { source, zoom, x, y } => {
            commands::uri::run(commands::uri::UriArgs { source, zoom, x, y })
        }
        Commands::Config(command) => commands::config::run(command, config_path),
        Commands::Fetch {
            source,
            lat,
            lon,
            zoom,
            output,
            wait,
        } => {
            let runner = CliRunner::new(config_path)?;
            commands::fetch::run(
                &runner,
                commands::fetch::FetchArgs {
                    source,
                    lat,
                    lon,
                    zoom,
                    output,
                    wait: Duration::from_secs(wait),
                },
            )
        }
        Commands::Prefetch {
            source,
            north,
            west,
            south,
            east,
            min_zoom,
            max_zoom,
            wait,
        } => {
            let runner = CliRunner::new(config_path)?;
            commands::prefetch::run(
                &runner,
                commands::prefetch::PrefetchArgs {
                    source,
                    north,
                    west,
                    south,
                    east,
                    min_zoom,
                    max_zoom,
                    wait: Duration::from_secs(wait),
                },
            )
        }
        Commands::Render {
            source,
            lat,
            lon,
            zoom,
            width,
            height,
            double_pixel,
            output,
            wait,
        } => {
            let runner = CliRunner::new(config_path)?;
            commands::render::run(
                &runner,
                commands::render::RenderArgs {
                    source,
                    lat,
                    lon,
                    zoom,
                    width,
                    height,
                    double_pixel,
                    output,
                    wait: Duration::from_secs(wait),
                },
            )
        }
    }
}
