//! Cross-origin policy.
//!
//! Every response leaving the server carries `Access-Control-Allow-Origin: *`,
//! including validation failures, timeouts and unknown paths. The layer sits
//! outermost in the stack so no inner exit path can drop the header; a
//! browser caller could not even read the error otherwise.

use axum::http::header::ACCESS_CONTROL_ALLOW_ORIGIN;
use axum::http::HeaderValue;
use tower_http::set_header::SetResponseHeaderLayer;

/// Value of the cross-origin header on every response.
pub const ALLOW_ANY_ORIGIN: &str = "*";

/// Layer stamping the wildcard cross-origin header onto every response.
pub fn allow_any_origin() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ANY_ORIGIN),
    )
}
