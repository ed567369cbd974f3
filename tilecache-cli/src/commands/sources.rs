//! Sources command - list the built-in and configured tile sources.

use std::path::Path;

use tilecache::config::ConfigFile;
use tilecache::source::SourceRegistry;

use crate::error::CliError;

/// Run the sources command.
///
/// User sources from `source.user_file` are listed after the presets.
pub fn run(all: bool, config_path: Option<&Path>) -> Result<(), CliError> {
    let config = match config_path {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let mut registry = SourceRegistry::new();
    if let Some(path) = &config.source.user_file {
        registry.load_user_file(path)?;
    }

    println!("{:>4}  {:<28} {:>5}  {:<5} Status", "ID", "Name", "Zoom", "Fmt");
    for source in registry.all() {
        let status = if !source.is_valid() {
            "retired"
        } else if source.is_active() {
            "active"
        } else {
            "inactive"
        };
        if !all && status != "active" {
            continue;
        }

        println!(
            "{:>4}  {:<28} {:>2}-{:<2}  {:<5} {}",
            source.id().0,
            source.name(),
            source.min_zoom(),
            source.max_zoom(),
            source.image_format(),
            status
        );
        if all {
            if let (Some(notice), _) = source.copyright() {
                println!("      {}", notice);
            }
        }
    }

    Ok(())
}
