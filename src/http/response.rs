//! Response translation.
//!
//! # Responsibilities
//! - Map interpretation errors to 400/405
//! - Map upstream outcomes to the outward response
//! - Answer preflight requests
//!
//! # Design Decisions
//! - Whole upstream body is returned verbatim; no streaming
//! - Upstream error bodies are never forwarded, only their status
//! - Transport failure detail is logged, the caller only sees a generic 502
//! - The cross-origin header is added by middleware, not here

use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::http::request::InterpretError;
use crate::upstream::UpstreamOutcome;

/// Message returned for every transport failure.
pub const FETCH_FAILED_MESSAGE: &str = "Proxy fetch failed";

/// JSON error body used for 400 and 502 responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Empty 204 acknowledging a browser preflight.
pub fn preflight() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Client input error → 400 with a reason, or bare 405.
pub fn rejected(err: &InterpretError) -> Response {
    match err {
        InterpretError::MethodNotAllowed(method) => {
            tracing::debug!(method = %method, "Method not allowed");
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        }
        _ => {
            tracing::debug!(reason = %err, "Rejected relay request");
            (StatusCode::BAD_REQUEST, Json(ErrorBody::new(err.to_string()))).into_response()
        }
    }
}

/// Upstream outcome → outward response.
pub fn translate(outcome: UpstreamOutcome, upstream_host: &str) -> Response {
    match outcome {
        UpstreamOutcome::Success(upstream) => (
            StatusCode::OK,
            [
                (CONTENT_TYPE, upstream.content_type),
                (CACHE_CONTROL, HeaderValue::from_static("no-cache")),
            ],
            upstream.body,
        )
            .into_response(),
        UpstreamOutcome::Status(status) => {
            tracing::debug!(upstream_host = %upstream_host, status = %status, "Upstream returned non-success status");
            status.into_response()
        }
        UpstreamOutcome::Failed(err) => {
            tracing::warn!(
                upstream_host = %upstream_host,
                cause = err.kind(),
                error = %err,
                "Proxy fetch failed"
            );
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorBody::new(FETCH_FAILED_MESSAGE)),
            )
                .into_response()
        }
    }
}
