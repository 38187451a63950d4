//! Request ID generation.
//!
//! Each inbound request gets an `x-request-id` (UUID v4) unless the caller
//! already sent one. The ID is recorded on the request's tracing span; it is
//! not echoed in responses so preflight answers carry only the CORS header.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId, SetRequestIdLayer};
use uuid::Uuid;

/// Header carrying the request ID.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRelayRequestId;

impl MakeRequestId for MakeRelayRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Layer that assigns an ID to requests missing one.
pub fn request_id_layer() -> SetRequestIdLayer<MakeRelayRequestId> {
    SetRequestIdLayer::new(X_REQUEST_ID, MakeRelayRequestId)
}

/// Read the request ID for logging.
pub fn request_id_of(request: &Request<Body>) -> &str {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}
