//! Result of one outbound fetch, as seen by the response translator.

use axum::body::Bytes;
use axum::http::{HeaderValue, StatusCode};

/// Content type reported when the upstream omits one.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// A fully buffered successful upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: HeaderValue,
    pub body: Bytes,
}

/// Every way a single upstream fetch can end.
#[derive(Debug)]
pub enum UpstreamOutcome {
    /// 2xx from the upstream, body buffered.
    Success(UpstreamResponse),
    /// The upstream answered with a non-success status. The body is discarded.
    Status(StatusCode),
    /// The call could not complete (DNS, TLS, timeout, reset, redirect limit).
    Failed(FetchError),
}

impl UpstreamOutcome {
    /// Short label for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            UpstreamOutcome::Success(_) => "success",
            UpstreamOutcome::Status(_) => "status",
            UpstreamOutcome::Failed(_) => "failed",
        }
    }
}

/// Transport-level failure of the outbound call.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("upstream request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("reading upstream body failed: {0}")]
    Body(#[source] reqwest::Error),
}

impl FetchError {
    fn inner(&self) -> &reqwest::Error {
        match self {
            FetchError::Request(e) | FetchError::Body(e) => e,
        }
    }

    /// Whether the configured deadline fired.
    pub fn is_timeout(&self) -> bool {
        self.inner().is_timeout()
    }

    /// Whether the connection could not be established.
    pub fn is_connect(&self) -> bool {
        self.inner().is_connect()
    }

    /// Whether the redirect policy aborted the fetch.
    pub fn is_redirect(&self) -> bool {
        self.inner().is_redirect()
    }

    /// Short cause for structured logs.
    pub fn kind(&self) -> &'static str {
        if self.is_timeout() {
            "timeout"
        } else if self.is_connect() {
            "connect"
        } else if self.is_redirect() {
            "redirect"
        } else if matches!(self, FetchError::Body(_)) {
            "body"
        } else {
            "request"
        }
    }
}
