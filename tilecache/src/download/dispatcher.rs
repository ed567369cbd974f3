//! Download dispatcher
//!
//! Deduplicates tile requests by URI, runs each transfer on a tokio task and
//! reports the outcome through a completion channel. The owner drains the
//! channel and calls [`DownloadDispatcher::settle`], so the session sets are
//! only ever touched from one place.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::http::{AsyncHttpClient, FetchError};
use super::job::{Completion, Delivered, DownloadJob, DownloadOutcome, RequestStatus};
use crate::coord::TileCoord;
use crate::source::{build_uri, Source, UriToken};

/// Referer sent to Google tile servers.
pub const GOOGLE_REFERER: &str = "http://maps.google.com/";

/// Environment variable consulted when no cookie is configured.
pub const GOOGLE_COOKIE_ENV: &str = "GOOGLE_COOKIE";

/// Picks the configured cookie, falling back to `GOOGLE_COOKIE`.
pub fn resolve_google_cookie(configured: Option<&str>) -> Option<String> {
    configured
        .filter(|c| !c.trim().is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var(GOOGLE_COOKIE_ENV).ok())
        .filter(|c| !c.trim().is_empty())
}

/// Issues and tracks tile downloads.
pub struct DownloadDispatcher<C> {
    client: Arc<C>,
    runtime: Handle,
    in_flight: HashSet<String>,
    missing: HashSet<String>,
    google_cookie: Option<String>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl<C> DownloadDispatcher<C>
where
    C: AsyncHttpClient + 'static,
{
    /// Creates a dispatcher spawning transfers on `runtime`.
    pub fn new(client: Arc<C>, runtime: Handle, google_cookie: Option<String>) -> Self {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        Self {
            client,
            runtime,
            in_flight: HashSet::new(),
            missing: HashSet::new(),
            google_cookie,
            completions_tx,
            completions_rx,
        }
    }

    /// Starts downloading a tile unless it is already in flight or known
    /// to be missing.
    pub fn request(
        &mut self,
        source: &Arc<Source>,
        tile: TileCoord,
        destination: PathBuf,
    ) -> RequestStatus {
        self.request_with(source, tile, destination, true)
    }

    /// Like [`request`](Self::request); `decode: false` starts a disk-only job.
    pub fn request_with(
        &mut self,
        source: &Arc<Source>,
        tile: TileCoord,
        destination: PathBuf,
        decode: bool,
    ) -> RequestStatus {
        if !source.is_valid() || !tile.is_in_range() {
            return RequestStatus::Unavailable;
        }
        let Some(uri) = build_uri(source, tile.zoom, tile.x, tile.y) else {
            return RequestStatus::Unavailable;
        };

        if self.in_flight.contains(&uri) {
            trace!(uri = %uri, "Download already in flight");
            return RequestStatus::AlreadyQueued;
        }
        if self.missing.contains(&uri) {
            trace!(uri = %uri, "Tile known to be missing");
            return RequestStatus::KnownMissing;
        }

        debug!(uri = %uri, tile = %tile, source = source.name(), "Queueing tile download");
        self.in_flight.insert(uri.clone());
        let job = DownloadJob::new(uri, destination, Arc::clone(source), tile);
        self.spawn(if decode { job } else { job.without_decode() });
        RequestStatus::Queued
    }

    /// Headers required by the job's source.
    fn headers_for(&self, source: &Source) -> Vec<(String, String)> {
        let format = source.uri_format();
        let mut headers = Vec::new();
        if format.has(UriToken::GoogleDomain) {
            headers.push(("Referer".to_string(), GOOGLE_REFERER.to_string()));
            if format.has(UriToken::Q) {
                if let Some(cookie) = &self.google_cookie {
                    headers.push(("Cookie".to_string(), cookie.clone()));
                }
            }
        }
        headers
    }

    fn spawn(&self, job: DownloadJob) {
        let client = Arc::clone(&self.client);
        let headers = self.headers_for(&job.source);
        let tx = self.completions_tx.clone();

        self.runtime.spawn(async move {
            let outcome = classify(client.get(&job.uri, &headers).await);
            // The receiver lives as long as the dispatcher
            let _ = tx.send(Completion { job, outcome });
        });
    }

    /// Applies a completion to the session sets.
    ///
    /// Returns the payload of a successful transfer; failures are handled
    /// here (recorded as missing, dropped or retried).
    pub fn settle(&mut self, completion: Completion) -> Option<Delivered> {
        let Completion { mut job, outcome } = completion;

        match outcome {
            DownloadOutcome::Success(data) => {
                self.in_flight.remove(&job.uri);
                trace!(uri = %job.uri, bytes = data.len(), "Download complete");
                Some(Delivered { job, data })
            }
            DownloadOutcome::NotFound => {
                self.in_flight.remove(&job.uri);
                info!(uri = %job.uri, "Tile not found, not requesting again");
                self.missing.insert(job.uri);
                None
            }
            DownloadOutcome::Offline => {
                self.in_flight.remove(&job.uri);
                debug!(uri = %job.uri, "Host unresolved, dropping download");
                None
            }
            DownloadOutcome::Retry(reason) => {
                job.attempt += 1;
                warn!(
                    uri = %job.uri,
                    attempt = job.attempt,
                    reason = %reason,
                    "Download failed, retrying"
                );
                self.spawn(job);
                None
            }
        }
    }

    /// Next completion if one is ready.
    pub fn try_next(&mut self) -> Option<Completion> {
        self.completions_rx.try_recv().ok()
    }

    /// Waits for the next completion.
    pub async fn next(&mut self) -> Option<Completion> {
        self.completions_rx.recv().await
    }

    /// Number of downloads in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, uri: &str) -> bool {
        self.in_flight.contains(uri)
    }

    pub fn is_missing(&self, uri: &str) -> bool {
        self.missing.contains(uri)
    }
}

/// Maps a transport result to an outcome.
fn classify(result: Result<super::http::HttpResponse, FetchError>) -> DownloadOutcome {
    match result {
        Ok(response) if response.is_success() => DownloadOutcome::Success(response.body),
        Ok(response) if response.status == 404 => DownloadOutcome::NotFound,
        Ok(response) => DownloadOutcome::Retry(format!("HTTP {}", response.status)),
        Err(FetchError::HostUnresolved(_)) => DownloadOutcome::Offline,
        Err(e) => DownloadOutcome::Retry(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::http::tests::MockAsyncHttpClient;
    use crate::download::http::HttpResponse;
    use crate::source::{SourceDescriptor, SourceId};

    fn source(template: &str) -> Arc<Source> {
        Arc::new(Source::new(
            SourceId(100),
            SourceDescriptor::new("Test", template, "png", 0, 18),
        ))
    }

    fn dispatcher(mock: MockAsyncHttpClient) -> (Arc<MockAsyncHttpClient>, DownloadDispatcher<MockAsyncHttpClient>) {
        let client = Arc::new(mock);
        let d = DownloadDispatcher::new(Arc::clone(&client), Handle::current(), None);
        (client, d)
    }

    fn ok(body: &[u8]) -> Result<HttpResponse, FetchError> {
        Ok(HttpResponse::new(200, body.to_vec()))
    }

    #[test]
    fn test_classify() {
        assert_eq!(classify(ok(b"x")), DownloadOutcome::Success(b"x".to_vec()));
        assert_eq!(
            classify(Ok(HttpResponse::new(404, vec![]))),
            DownloadOutcome::NotFound
        );
        assert_eq!(
            classify(Ok(HttpResponse::new(503, vec![]))),
            DownloadOutcome::Retry("HTTP 503".to_string())
        );
        assert_eq!(
            classify(Err(FetchError::HostUnresolved("u".into()))),
            DownloadOutcome::Offline
        );
        assert!(matches!(
            classify(Err(FetchError::Transport("reset".into()))),
            DownloadOutcome::Retry(_)
        ));
    }

    #[test]
    fn test_resolve_google_cookie_prefers_configured() {
        assert_eq!(
            resolve_google_cookie(Some("PREF=1")),
            Some("PREF=1".to_string())
        );
    }

    #[tokio::test]
    async fn test_duplicate_request_is_deduplicated() {
        let (client, mut d) = dispatcher(MockAsyncHttpClient::new(ok(b"tile")));
        let s = source("http://t/#Z/#X/#Y.png");
        let tile = TileCoord::new(3, 2, 5);

        assert_eq!(d.request(&s, tile, "a".into()), RequestStatus::Queued);
        assert_eq!(d.request(&s, tile, "a".into()), RequestStatus::AlreadyQueued);
        assert_eq!(d.in_flight(), 1);

        let completion = d.next().await.unwrap();
        let delivered = d.settle(completion).unwrap();
        assert_eq!(delivered.data, b"tile");
        assert_eq!(d.in_flight(), 0);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_not_found_is_remembered() {
        let (client, mut d) =
            dispatcher(MockAsyncHttpClient::new(Ok(HttpResponse::new(404, vec![]))));
        let s = source("http://t/#Z/#X/#Y.png");
        let tile = TileCoord::new(1, 0, 0);

        d.request(&s, tile, "a".into());
        let completion = d.next().await.unwrap();
        assert!(d.settle(completion).is_none());
        assert!(d.is_missing("http://t/1/0/0.png"));

        assert_eq!(d.request(&s, tile, "a".into()), RequestStatus::KnownMissing);
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test]
    async fn test_offline_is_dropped_silently() {
        let (client, mut d) = dispatcher(MockAsyncHttpClient::new(Err(
            FetchError::HostUnresolved("t".into()),
        )));
        let s = source("http://t/#Z/#X/#Y.png");
        let tile = TileCoord::new(1, 1, 1);

        d.request(&s, tile, "a".into());
        let completion = d.next().await.unwrap();
        assert!(d.settle(completion).is_none());
        assert_eq!(d.in_flight(), 0);
        assert!(!d.is_missing("http://t/1/1/1.png"));

        // Not remembered, so a later request tries again
        assert_eq!(d.request(&s, tile, "a".into()), RequestStatus::Queued);
        assert_eq!(d.next().await.map(|c| c.outcome), Some(DownloadOutcome::Offline));
        assert_eq!(client.calls(), 2);
    }

    #[tokio::test]
    async fn test_failures_are_retried_until_success() {
        let (client, mut d) = dispatcher(MockAsyncHttpClient::with_script(
            vec![
                Ok(HttpResponse::new(503, vec![])),
                Err(FetchError::Transport("reset".into())),
            ],
            ok(b"finally"),
        ));
        let s = source("http://t/#Z/#X/#Y.png");
        d.request(&s, TileCoord::new(2, 1, 1), "a".into());

        let delivered = loop {
            let completion = d.next().await.unwrap();
            assert!(d.is_in_flight("http://t/2/1/1.png"));
            if let Some(delivered) = d.settle(completion) {
                break delivered;
            }
        };

        assert_eq!(delivered.data, b"finally");
        assert_eq!(delivered.job.attempt, 2);
        assert_eq!(client.calls(), 3);
        assert_eq!(d.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_invalid_source_is_unavailable() {
        let (client, mut d) = dispatcher(MockAsyncHttpClient::new(ok(b"")));
        let s = source("http://t/#Z/#X/#Y.png");
        s.set_active(false);
        assert_eq!(
            d.request(&s, TileCoord::new(1, 0, 0), "a".into()),
            RequestStatus::Unavailable
        );

        let s = source("http://t/#Z/#X/#Y.png");
        assert_eq!(
            d.request(&s, TileCoord::new(1, 2, 0), "a".into()),
            RequestStatus::Unavailable
        );
        assert_eq!(client.calls(), 0);
    }

    #[tokio::test]
    async fn test_google_headers() {
        let (client, mut d) = dispatcher(MockAsyncHttpClient::new(ok(b"")));
        d.google_cookie = Some("NID=42".to_string());

        let plain = source("http://mt#R.google.com/vt?x=#X&y=#Y&z=#Z");
        d.request(&plain, TileCoord::new(1, 0, 0), "a".into());
        d.next().await.unwrap();

        let keyed = source("http://khm#R.google.com/kh?t=#Q");
        d.request(&keyed, TileCoord::new(1, 0, 0), "b".into());
        d.next().await.unwrap();

        let requests = client.requests();
        assert_eq!(
            requests[0].1,
            vec![("Referer".to_string(), GOOGLE_REFERER.to_string())]
        );
        assert_eq!(requests[1].1.len(), 2);
        assert_eq!(requests[1].1[1], ("Cookie".to_string(), "NID=42".to_string()));
    }

    #[tokio::test]
    async fn test_disk_only_job_survives_retry() {
        let (_client, mut d) = dispatcher(MockAsyncHttpClient::with_script(
            vec![Ok(HttpResponse::new(500, vec![]))],
            ok(b"tile"),
        ));
        let s = source("http://t/#Z/#X/#Y.png");
        d.request_with(&s, TileCoord::new(1, 1, 0), "/c/1/1/0.png".into(), false);

        let delivered = loop {
            let completion = d.next().await.unwrap();
            if let Some(delivered) = d.settle(completion) {
                break delivered;
            }
        };
        assert!(!delivered.job.decode);
        assert_eq!(delivered.job.attempt, 1);
    }

    #[tokio::test]
    async fn test_other_hosts_get_no_headers() {
        let (client, mut d) = dispatcher(MockAsyncHttpClient::new(ok(b"")));
        d.request(&source("http://t/#Z/#X/#Y.png"), TileCoord::new(0, 0, 0), "a".into());
        d.next().await.unwrap();
        assert!(client.requests()[0].1.is_empty());
    }
}
