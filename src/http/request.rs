//! Request interpretation.
//!
//! # Responsibilities
//! - Decide what an inbound request asks for from its method
//! - Extract the target URL from the query string (GET) or JSON body (POST)
//! - Capture the caller's declared User-Agent for the outbound call
//!
//! # Design Decisions
//! - URL shape is not validated here; malformed URLs fail later as fetch errors
//! - The POST path is an alternate encoding of the same request, for URLs too
//!   long for a query string
//! - POST bodies are resolved once into a [`RelayBody`] before any field lookup

use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, HeaderValue, Method};
use serde_json::Value;

/// Query parameter and body field carrying the target URL.
pub const URL_PARAM: &str = "url";

/// Where the target URL was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetEncoding {
    Query,
    Body,
}

/// A validated relay request, ready for the upstream fetcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayTarget {
    pub url: String,
    pub encoding: TargetEncoding,
    pub user_agent: Option<HeaderValue>,
}

/// What the inbound request asks the relay to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpreted {
    /// Browser preflight; answered without touching the upstream.
    Preflight,
    Fetch(RelayTarget),
}

/// Client input errors. All map to 4xx responses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpretError {
    #[error("Missing url query parameter")]
    MissingQueryUrl,
    #[error("Invalid JSON body")]
    InvalidBody,
    #[error("Missing url in request body")]
    MissingBodyUrl,
    #[error("Method {0} not allowed")]
    MethodNotAllowed(Method),
}

/// POST body, resolved once at the top of interpretation.
///
/// Some callers send the JSON document itself; others send it wrapped in a
/// JSON string that needs its own parse.
#[derive(Debug, Clone, PartialEq)]
pub enum RelayBody {
    Structured(Value),
    Encoded(String),
}

impl RelayBody {
    /// Classify raw body bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InterpretError> {
        match serde_json::from_slice::<Value>(bytes) {
            Ok(Value::String(text)) => Ok(RelayBody::Encoded(text)),
            Ok(value) => Ok(RelayBody::Structured(value)),
            Err(_) => Err(InterpretError::InvalidBody),
        }
    }

    /// Produce the structured document, decoding once more if needed.
    pub fn into_value(self) -> Result<Value, InterpretError> {
        match self {
            RelayBody::Structured(value) => Ok(value),
            RelayBody::Encoded(text) => {
                serde_json::from_str(&text).map_err(|_| InterpretError::InvalidBody)
            }
        }
    }
}

/// Interpret an inbound request.
///
/// `query` is the raw (still percent-encoded) query string; `body` is only
/// consulted for POST.
pub fn interpret(
    method: &Method,
    query: Option<&str>,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Interpreted, InterpretError> {
    let (url, encoding) = match *method {
        Method::OPTIONS => return Ok(Interpreted::Preflight),
        Method::GET => (url_from_query(query)?, TargetEncoding::Query),
        Method::POST => (url_from_body(body)?, TargetEncoding::Body),
        _ => return Err(InterpretError::MethodNotAllowed(method.clone())),
    };

    Ok(Interpreted::Fetch(RelayTarget {
        url,
        encoding,
        // An empty User-Agent counts as none, so the fallback is sent instead.
        user_agent: headers
            .get(USER_AGENT)
            .filter(|agent| !agent.is_empty())
            .cloned(),
    }))
}

fn url_from_query(query: Option<&str>) -> Result<String, InterpretError> {
    query
        .and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(key, _)| key == URL_PARAM)
                .map(|(_, value)| value.into_owned())
        })
        .filter(|url| !url.is_empty())
        .ok_or(InterpretError::MissingQueryUrl)
}

fn url_from_body(body: &[u8]) -> Result<String, InterpretError> {
    let document = RelayBody::from_bytes(body)?.into_value()?;
    document
        .get(URL_PARAM)
        .and_then(Value::as_str)
        .filter(|url| !url.is_empty())
        .map(str::to_owned)
        .ok_or(InterpretError::MissingBodyUrl)
}
