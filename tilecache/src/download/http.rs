//! HTTP client abstraction for testability

use std::error::Error as StdError;
use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, trace, warn};

/// Default User-Agent string for HTTP requests.
/// Some tile servers reject requests without one.
const DEFAULT_USER_AGENT: &str = concat!("tilecache/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Substrings that identify a name-resolution failure in an error chain.
const UNRESOLVED_MARKERS: [&str; 3] = [
    "dns error",
    "failed to lookup address",
    "Name or service not known",
];

/// Transport-level failures.
///
/// HTTP error statuses are not errors here; they come back in
/// [`HttpResponse::status`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The host name could not be resolved, usually because we are offline
    #[error("Cannot resolve host for {0}")]
    HostUnresolved(String),

    /// Connection, timeout or body read failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Client could not be constructed
    #[error("Failed to create HTTP client: {0}")]
    ClientBuild(String),
}

/// Status and body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Asynchronous HTTP GET used by the download dispatcher.
pub trait AsyncHttpClient: Send + Sync {
    /// Performs an async HTTP GET request with extra headers.
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request
    /// * `headers` - `(name, value)` pairs to add to the request
    fn get(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> impl Future<Output = Result<HttpResponse, FetchError>> + Send;
}

/// Options for [`ReqwestClient`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: Duration,
    /// Optional HTTP proxy URI applied to all requests
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_config(&HttpConfig::default())
    }

    /// Creates a new ReqwestClient with a custom timeout and optional proxy.
    pub fn with_config(config: &HttpConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true);

        if let Some(proxy) = config.proxy.as_deref().filter(|p| !p.is_empty()) {
            let proxy = reqwest::Proxy::all(proxy)
                .map_err(|e| FetchError::ClientBuild(format!("invalid proxy '{}': {}", proxy, e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::ClientBuild(e.to_string()))?;

        Ok(Self { client })
    }
}

impl AsyncHttpClient for ReqwestClient {
    async fn get(&self, url: &str, headers: &[(String, String)]) -> Result<HttpResponse, FetchError> {
        trace!(url = url, headers = headers.len(), "HTTP GET request starting");

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = match request.send().await {
            Ok(resp) => {
                debug!(
                    url = url,
                    status = resp.status().as_u16(),
                    "HTTP response received"
                );
                resp
            }
            Err(e) => {
                if is_unresolved(&e) {
                    debug!(url = url, error = %e, "Host could not be resolved");
                    return Err(FetchError::HostUnresolved(url.to_string()));
                }
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(FetchError::Transport(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(HttpResponse::new(status, bytes.to_vec()))
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(FetchError::Transport(format!("Failed to read response: {}", e)))
            }
        }
    }
}

/// Walks the error chain looking for a DNS failure.
fn is_unresolved(error: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(e) = current {
        let message = e.to_string();
        if UNRESOLVED_MARKERS.iter().any(|m| message.contains(m)) {
            return true;
        }
        current = e.source();
    }
    false
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Mock async HTTP client replaying scripted results.
    ///
    /// Once the script runs out every call returns `fallback`.
    pub struct MockAsyncHttpClient {
        script: Mutex<VecDeque<Result<HttpResponse, FetchError>>>,
        fallback: Result<HttpResponse, FetchError>,
        calls: AtomicUsize,
        requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl MockAsyncHttpClient {
        pub fn new(fallback: Result<HttpResponse, FetchError>) -> Self {
            Self {
                script: Mutex::new(VecDeque::new()),
                fallback,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn with_script(
            script: Vec<Result<HttpResponse, FetchError>>,
            fallback: Result<HttpResponse, FetchError>,
        ) -> Self {
            let mock = Self::new(fallback);
            *mock.script.lock().unwrap() = script.into();
            mock
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        pub fn requests(&self) -> Vec<(String, Vec<(String, String)>)> {
            self.requests.lock().unwrap().clone()
        }
    }

    impl AsyncHttpClient for MockAsyncHttpClient {
        async fn get(
            &self,
            url: &str,
            headers: &[(String, String)],
        ) -> Result<HttpResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .unwrap()
                .push((url.to_string(), headers.to_vec()));
            let next = self.script.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }
    }

    #[derive(Debug)]
    struct Wrapped(&'static str, Option<Box<Wrapped>>);

    impl std::fmt::Display for Wrapped {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl StdError for Wrapped {
        fn source(&self) -> Option<&(dyn StdError + 'static)> {
            self.1.as_deref().map(|e| e as &(dyn StdError + 'static))
        }
    }

    #[test]
    fn test_is_unresolved_searches_chain() {
        let error = Wrapped(
            "error sending request",
            Some(Box::new(Wrapped(
                "client error (Connect)",
                Some(Box::new(Wrapped("dns error: failed to lookup address information", None))),
            ))),
        );
        assert!(is_unresolved(&error));
    }

    #[test]
    fn test_is_unresolved_ignores_other_failures() {
        let error = Wrapped("connection refused", None);
        assert!(!is_unresolved(&error));
    }

    #[test]
    fn test_response_success_range() {
        assert!(HttpResponse::new(200, vec![]).is_success());
        assert!(HttpResponse::new(204, vec![]).is_success());
        assert!(!HttpResponse::new(404, vec![]).is_success());
        assert!(!HttpResponse::new(503, vec![]).is_success());
    }

    #[test]
    fn test_client_builds_with_proxy() {
        let config = HttpConfig {
            proxy: Some("http://127.0.0.1:3128".to_string()),
            ..HttpConfig::default()
        };
        assert!(ReqwestClient::with_config(&config).is_ok());
    }

    #[tokio::test]
    async fn test_mock_replays_script_then_fallback() {
        let mock = MockAsyncHttpClient::with_script(
            vec![Ok(HttpResponse::new(500, vec![]))],
            Ok(HttpResponse::new(200, vec![1, 2])),
        );
        assert_eq!(mock.get("http://a", &[]).await.unwrap().status, 500);
        assert_eq!(mock.get("http://a", &[]).await.unwrap().status, 200);
        assert_eq!(mock.calls(), 2);
    }
}
