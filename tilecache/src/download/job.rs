//! Download jobs and their outcomes.

use std::path::PathBuf;
use std::sync::Arc;

use crate::coord::TileCoord;
use crate::source::Source;

/// One tile transfer.
///
/// At most one job per distinct `uri` exists at a time.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub uri: String,
    /// Where the tile is stored: an absolute disk path when a disk cache is
    /// configured, otherwise a relative tile id.
    pub destination: PathBuf,
    pub source: Arc<Source>,
    pub tile: TileCoord,
    /// Number of previous attempts
    pub attempt: u32,
    /// Whether the payload is decoded into the memory cache on arrival.
    /// Prefetch jobs only write through to disk.
    pub decode: bool,
}

impl DownloadJob {
    pub fn new(uri: String, destination: PathBuf, source: Arc<Source>, tile: TileCoord) -> Self {
        Self {
            uri,
            destination,
            source,
            tile,
            attempt: 0,
            decode: true,
        }
    }

    /// Marks the job as disk-only.
    pub fn without_decode(mut self) -> Self {
        self.decode = false;
        self
    }

    /// Whether the bytes should be written to a disk cache file.
    pub fn writes_to_disk(&self) -> bool {
        self.destination.is_absolute()
    }
}

/// How a transfer ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// 2xx with the response body
    Success(Vec<u8>),
    /// 404: the tile does not exist on the server
    NotFound,
    /// Host unresolvable, abandoned without retry
    Offline,
    /// Any other status or transport error
    Retry(String),
}

/// A finished transfer reported back to the owner.
#[derive(Debug)]
pub struct Completion {
    pub job: DownloadJob,
    pub outcome: DownloadOutcome,
}

/// A successful transfer ready to be written through the caches.
#[derive(Debug)]
pub struct Delivered {
    pub job: DownloadJob,
    pub data: Vec<u8>,
}

/// Result of asking the dispatcher for a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestStatus {
    /// A new transfer was started
    Queued,
    /// The uri is already downloading
    AlreadyQueued,
    /// The uri returned 404 earlier this session
    KnownMissing,
    /// The source is inactive, has no URI, or the tile is out of range
    Unavailable,
    /// A fresh copy is already on disk
    Cached,
}
