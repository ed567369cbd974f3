//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization, runtime and engine
//! creation so command handlers stay small.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{info, warn};

use tilecache::config::ConfigFile;
use tilecache::logging::{init_logging, LoggingGuard};
use tilecache::source::{Source, SourceId};
use tilecache::{ReqwestClient, TileEngine};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Load config (from `config_path` or the default location) and
    /// initialize logging.
    pub fn new(config_path: Option<&Path>) -> Result<Self, CliError> {
        let config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };

        let logging_guard = init_logging(&config.logging.directory, &config.logging.file)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("tilecache v{}", env!("CARGO_PKG_VERSION"));
        info!("tilecache CLI: {} command", command);
    }

    /// Create a multi-threaded runtime for downloads.
    pub fn runtime(&self) -> Result<Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }

    /// Create an engine backed by reqwest, spawning onto `runtime`.
    pub fn create_engine(&self, runtime: &Runtime) -> Result<TileEngine<ReqwestClient>, CliError> {
        let client = ReqwestClient::with_config(&self.config.http_config())
            .map_err(CliError::HttpClient)?;
        let mut engine = TileEngine::with_handle(
            client,
            self.config.engine_config(),
            runtime.handle().clone(),
        );
        if let Some(path) = &self.config.source.user_file {
            let added = engine.sources().load_user_file(path)?;
            info!(count = added.len(), path = %path.display(), "Loaded user sources");
        }
        info!("Engine created");
        Ok(engine)
    }
}

/// Resolve a `--source` argument: a numeric id, a source name, or the
/// configured default when absent.
pub fn resolve_source(
    engine: &mut TileEngine<ReqwestClient>,
    arg: Option<&str>,
    config: &ConfigFile,
) -> Result<Arc<Source>, CliError> {
    let source = match arg {
        None => engine.source(config.source_id())?,
        Some(value) => match value.parse::<u32>() {
            Ok(id) => engine.source(SourceId(id))?,
            Err(_) => engine.sources().get_by_name(value)?,
        },
    };

    if !source.is_valid() {
        return Err(CliError::Config(format!(
            "Source '{}' has no tile server and cannot be downloaded from",
            source.name()
        )));
    }
    Ok(source)
}

/// Apply completions until nothing is queued or `limit` runs out.
///
/// Returns `false` when the limit was hit with downloads still in flight.
pub async fn wait_for_downloads(
    engine: &mut TileEngine<ReqwestClient>,
    limit: Duration,
) -> bool {
    match tokio::time::timeout(limit, engine.drain()).await {
        Ok(()) => true,
        Err(_) => {
            warn!(
                pending = engine.tiles_queued(),
                "Gave up waiting for downloads"
            );
            false
        }
    }
}

/// Write `data` to `path`, creating parent directories.
pub fn write_file(path: &Path, data: &[u8]) -> Result<(), CliError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CliError::FileWrite {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
    }
    std::fs::write(path, data).map_err(|e| CliError::FileWrite {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}
