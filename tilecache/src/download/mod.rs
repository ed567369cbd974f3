//! Tile downloads
//!
//! The [`AsyncHttpClient`] trait is the network seam; [`ReqwestClient`] is
//! the production implementation. The [`DownloadDispatcher`] owns the
//! in-flight and permanently-missing sets and turns HTTP results into
//! [`DownloadOutcome`]s.

mod dispatcher;
pub mod http;
mod job;

pub use dispatcher::{resolve_google_cookie, DownloadDispatcher, GOOGLE_COOKIE_ENV, GOOGLE_REFERER};
pub use http::{
    AsyncHttpClient, FetchError, HttpConfig, HttpResponse, ReqwestClient, DEFAULT_TIMEOUT_SECS,
};
pub use job::{Completion, Delivered, DownloadJob, DownloadOutcome, RequestStatus};
