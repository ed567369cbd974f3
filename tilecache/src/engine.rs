//! Tile engine
//!
//! [`TileEngine`] is the single owner of every cache and queue. Hosts ask it
//! for tiles and viewports, feed it download completions from its own
//! channel, and subscribe to [`TileEvent`]s to learn when to redraw.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

use crate::cache::{relative_tile_id, CacheDirMode, CacheStats, DiskCache, MemoryCache};
use crate::codec::{ImageDecoder, TileDecoder, TileImage};
use crate::compositor::{compose, Viewport};
use crate::config::DEFAULT_MAX_TILES;
use crate::coord::{to_tile_coords, CoordError, TileCoord, MAX_ZOOM};
use crate::download::{AsyncHttpClient, Completion, DownloadDispatcher, RequestStatus};
use crate::events::{EventBus, RedrawFlag, SubscriptionId, TileEvent};
use crate::fallback::{find_renderable, Renderable, TileLookup};
use crate::source::{build_uri, CachePolicy, Source, SourceError, SourceId, SourceRegistry};

/// Smallest viewport edge that can be rendered.
const MIN_VIEWPORT_EDGE: u32 = 2;

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Viewport {width}x{height} is too small to render")]
    ViewportTooSmall { width: u32, height: u32 },

    #[error("No tokio runtime available: {0}")]
    NoRuntime(String),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Coord(#[from] CoordError),
}

/// Engine options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub cache_dir: CacheDirMode,
    /// Memory cache size that triggers a purge
    pub max_tiles: usize,
    /// Cookie sent with keyed Google requests
    pub google_cookie: Option<String>,
    /// Default border of viewports built by [`TileEngine::viewport`]
    pub border: u32,
    /// Default double-pixel mode of viewports built by [`TileEngine::viewport`]
    pub double_pixel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_dir: CacheDirMode::Disabled,
            max_tiles: DEFAULT_MAX_TILES,
            google_cookie: None,
            border: 0,
            double_pixel: false,
        }
    }
}

/// Memory key of a tile: its disk path, or a relative id without a disk cache.
fn tile_key(disk: &DiskCache, source: &Source, tile: TileCoord) -> PathBuf {
    disk.tile_path(source, tile.zoom, tile.x, tile.y)
        .unwrap_or_else(|| relative_tile_id(source, tile.zoom, tile.x, tile.y))
}

/// Memory, then disk.
struct CacheChain<'a> {
    memory: &'a mut MemoryCache,
    disk: &'a DiskCache,
    decoder: &'a dyn TileDecoder,
    source: &'a Source,
    /// Disk files read during the lookup that failed to decode
    corrupt: Vec<PathBuf>,
}

impl TileLookup for CacheChain<'_> {
    fn lookup(&mut self, tile: TileCoord) -> Option<TileImage> {
        let key = tile_key(self.disk, self.source, tile);
        if let Some(image) = self.memory.get(&key) {
            return Some(image);
        }
        if !self.disk.is_enabled() {
            return None;
        }

        let data = self.disk.read(&key)?;
        match self.decoder.decode(&data) {
            Ok(image) => {
                self.memory.put(key, TileImage::clone(&image));
                Some(image)
            }
            Err(e) => {
                debug!(path = %key.display(), error = %e, "Cached tile could not be decoded");
                self.corrupt.push(key);
                None
            }
        }
    }
}

/// Tile acquisition and caching engine.
pub struct TileEngine<C> {
    config: EngineConfig,
    sources: SourceRegistry,
    disk: DiskCache,
    memory: MemoryCache,
    decoder: Box<dyn TileDecoder>,
    dispatcher: DownloadDispatcher<C>,
    events: EventBus,
    redraw: RedrawFlag,
    /// Tiles held only in memory because their disk write failed
    unwritten: HashSet<PathBuf>,
    /// Tiles whose downloaded bytes did not decode this session
    undecodable: HashSet<PathBuf>,
}

impl<C> TileEngine<C>
where
    C: AsyncHttpClient + 'static,
{
    /// Creates an engine that spawns downloads on the current tokio runtime.
    pub fn new(client: C, config: EngineConfig) -> Result<Self, EngineError> {
        let handle = Handle::try_current().map_err(|e| EngineError::NoRuntime(e.to_string()))?;
        Ok(Self::with_handle(client, config, handle))
    }

    /// Creates an engine that spawns downloads on `runtime`.
    pub fn with_handle(client: C, config: EngineConfig, runtime: Handle) -> Self {
        let dispatcher =
            DownloadDispatcher::new(Arc::new(client), runtime, config.google_cookie.clone());
        info!(
            cache_dir = %config.cache_dir,
            max_tiles = config.max_tiles,
            "Tile engine created"
        );
        Self {
            disk: DiskCache::new(config.cache_dir.clone()),
            config,
            sources: SourceRegistry::new(),
            memory: MemoryCache::new(),
            decoder: Box::new(ImageDecoder),
            dispatcher,
            events: EventBus::new(),
            redraw: RedrawFlag::default(),
            unwritten: HashSet::new(),
            undecodable: HashSet::new(),
        }
    }

    /// Replaces the image decoder.
    pub fn with_decoder(mut self, decoder: impl TileDecoder + 'static) -> Self {
        self.decoder = Box::new(decoder);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sources(&mut self) -> &mut SourceRegistry {
        &mut self.sources
    }

    /// Looks up a source by id.
    pub fn source(&mut self, id: SourceId) -> Result<Arc<Source>, EngineError> {
        Ok(self.sources.get_by_id(id)?)
    }

    pub fn subscribe(
        &mut self,
        observer: impl FnMut(&TileEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.events.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// A viewport with the configured border and double-pixel mode.
    pub fn viewport(&self, map_x: i64, map_y: i64, width: u32, height: u32, zoom: u8) -> Viewport {
        Viewport {
            border: self.config.border,
            double_pixel: self.config.double_pixel,
            ..Viewport::new(map_x, map_y, width, height, zoom)
        }
    }

    /// Download URI of a tile with fresh shard picks.
    pub fn tile_uri(&self, source: &Source, zoom: u8, x: u32, y: u32) -> Option<String> {
        build_uri(source, zoom, x, y)
    }

    /// Path of a cached tile file that may be used as is.
    ///
    /// `None` when there is no disk cache, the file does not exist, or it
    /// has outlived its TTL.
    pub fn cached_tile_path(&self, source: &Source, zoom: u8, x: u32, y: u32) -> Option<PathBuf> {
        self.disk
            .tile_path(source, zoom, x, y)
            .filter(|path| self.disk.is_fresh(path, source))
    }

    /// Requests a tile download unless a fresh copy is on disk.
    pub fn request_tile(&mut self, source: &Arc<Source>, zoom: u8, x: u32, y: u32) -> RequestStatus {
        let tile = TileCoord::new(zoom, x, y);
        let key = tile_key(&self.disk, source, tile);
        if self.disk.is_enabled() && self.disk.is_fresh(&key, source) {
            return RequestStatus::Cached;
        }
        self.dispatch(source, tile, key, true)
    }

    fn dispatch(
        &mut self,
        source: &Arc<Source>,
        tile: TileCoord,
        key: PathBuf,
        decode: bool,
    ) -> RequestStatus {
        if !source.supports_zoom(tile.zoom) {
            return RequestStatus::Unavailable;
        }
        self.dispatcher.request_with(source, tile, key, decode)
    }

    /// Whether rendering a tile should start a download.
    fn needs_download(&self, source: &Source, key: &Path) -> bool {
        if self.undecodable.contains(key) {
            return false;
        }
        if !self.disk.is_enabled() {
            return !self.memory.contains(key);
        }
        if self.disk.is_fresh(key, source) {
            return false;
        }
        // A tile that could not be written is served from memory until evicted
        !(self.unwritten.contains(key) && self.memory.contains(key))
    }

    /// Best available image for one tile.
    ///
    /// Missing or stale tiles are requested on the way. Stale images are
    /// still returned while the refetch runs. Only never-expire sources fall
    /// back to upscaled ancestors.
    pub fn load_tile(&mut self, source: &Arc<Source>, tile: TileCoord) -> Option<Renderable> {
        let key = tile_key(&self.disk, source, tile);
        if self.needs_download(source, &key) {
            self.dispatch(source, tile, key.clone(), true);
        }

        let mut chain = CacheChain {
            memory: &mut self.memory,
            disk: &self.disk,
            decoder: self.decoder.as_ref(),
            source,
            corrupt: Vec::new(),
        };
        let found = match source.cache_policy() {
            CachePolicy::NeverExpire => find_renderable(&mut chain, tile),
            CachePolicy::HonorTtl => chain
                .lookup(tile)
                .map(|image| Renderable::exact(image, tile.zoom)),
        };

        // An undecodable file on disk counts as a miss
        if chain.corrupt.contains(&key) && !self.undecodable.contains(&key) {
            debug!(tile = %tile, path = %key.display(), "Refetching corrupt cached tile");
            self.dispatch(source, tile, key, true);
        }
        found
    }

    /// Renders a viewport.
    ///
    /// Starts a new cache generation, composes every visible tile and
    /// finally purges tiles the render did not touch if the memory cache is
    /// full. Clears the pending-redraw flag.
    pub fn render_viewport(
        &mut self,
        source: &Arc<Source>,
        viewport: &Viewport,
    ) -> Result<RgbaImage, EngineError> {
        if viewport.width < MIN_VIEWPORT_EDGE || viewport.height < MIN_VIEWPORT_EDGE {
            return Err(EngineError::ViewportTooSmall {
                width: viewport.width,
                height: viewport.height,
            });
        }
        if viewport.zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(viewport.zoom).into());
        }

        self.redraw.take();
        let generation = self.memory.begin_generation();
        let surface = compose(viewport, |tile| self.load_tile(source, tile));
        let purged = self.memory.purge_if_oversized(self.config.max_tiles);

        debug!(
            generation,
            purged,
            queued = self.dispatcher.in_flight(),
            "Rendered viewport"
        );
        Ok(surface)
    }

    /// Applies every completion that is ready. Returns how many were handled.
    pub fn process_completions(&mut self) -> usize {
        let mut handled = 0;
        while let Some(completion) = self.dispatcher.try_next() {
            self.apply(completion);
            handled += 1;
        }
        handled
    }

    /// Waits for one completion and applies it.
    pub async fn next_completion(&mut self) -> bool {
        match self.dispatcher.next().await {
            Some(completion) => {
                self.apply(completion);
                true
            }
            None => false,
        }
    }

    /// Applies completions until nothing is in flight.
    pub async fn drain(&mut self) {
        while self.tiles_queued() > 0 {
            if !self.next_completion().await {
                break;
            }
        }
    }

    fn apply(&mut self, completion: Completion) {
        let Some(delivered) = self.dispatcher.settle(completion) else {
            return;
        };
        let job = delivered.job;
        let path = job.destination.clone();

        let written = if job.writes_to_disk() {
            match self.disk.write(&path, &delivered.data) {
                Ok(()) => {
                    self.unwritten.remove(&path);
                    self.events.emit(&TileEvent::Saved { path: path.clone() });
                    true
                }
                Err(e) => {
                    warn!(uri = %job.uri, error = %e, "Failed to cache tile");
                    false
                }
            }
        } else {
            self.events.emit(&TileEvent::Received { path: path.clone() });
            false
        };

        // Disk-only jobs leave decoding to the next render
        let changed = if !job.decode {
            written
        } else {
            match self.decoder.decode(&delivered.data) {
                Ok(image) => {
                    self.undecodable.remove(&path);
                    if job.writes_to_disk() && !written {
                        self.unwritten.insert(path.clone());
                    }
                    self.memory.put(path, image);
                    true
                }
                Err(e) => {
                    debug!(uri = %job.uri, error = %e, "Downloaded tile could not be decoded");
                    self.undecodable.insert(path);
                    false
                }
            }
        };

        if changed && self.redraw.request() {
            self.events.emit(&TileEvent::RedrawRequested);
        }
    }

    /// Whether a redraw is pending; clears the flag.
    pub fn take_redraw(&mut self) -> bool {
        self.redraw.take()
    }

    pub fn redraw_pending(&self) -> bool {
        self.redraw.is_pending()
    }

    /// Requests every tile covering a lat/lon box for a range of zooms.
    ///
    /// `nw` and `se` are `(lat, lon)` corners. The zoom range is clamped to
    /// the source's. Returns the number of downloads started.
    ///
    /// With a disk cache the downloads are only written to disk; the memory
    /// cache is filled by later renders.
    pub fn download_region(
        &mut self,
        source: &Arc<Source>,
        nw: (f64, f64),
        se: (f64, f64),
        zoom_start: u8,
        zoom_end: u8,
    ) -> Result<usize, EngineError> {
        let zoom_start = zoom_start.max(source.min_zoom());
        let zoom_end = zoom_end.min(source.max_zoom());
        let mut queued = 0;

        for zoom in zoom_start..=zoom_end {
            let a = to_tile_coords(nw.0, nw.1, zoom)?;
            let b = to_tile_coords(se.0, se.1, zoom)?;

            for x in a.x.min(b.x)..=a.x.max(b.x) {
                for y in a.y.min(b.y)..=a.y.max(b.y) {
                    if self.prefetch_tile(source, TileCoord::new(zoom, x, y)) {
                        queued += 1;
                    }
                }
            }
        }

        info!(
            source = source.name(),
            zoom_start,
            zoom_end,
            queued,
            "Region download requested"
        );
        Ok(queued)
    }

    fn prefetch_tile(&mut self, source: &Arc<Source>, tile: TileCoord) -> bool {
        let key = tile_key(&self.disk, source, tile);
        let disk_only = self.disk.is_enabled();
        if disk_only && self.disk.is_fresh(&key, source) {
            return false;
        }
        self.dispatch(source, tile, key, !disk_only) == RequestStatus::Queued
    }

    /// Number of downloads in flight.
    pub fn tiles_queued(&self) -> usize {
        self.dispatcher.in_flight()
    }

    pub fn memory_stats(&self) -> &CacheStats {
        self.memory.stats()
    }

    /// Decoded tiles currently held in memory.
    pub fn memory_tiles(&self) -> usize {
        self.memory.len()
    }
}
