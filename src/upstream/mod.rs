//! Upstream fetch subsystem.
//!
//! # Data Flow
//! ```text
//! validated target URL + caller User-Agent
//!     → fetcher.rs (single GET, redirects, timeout)
//!     → outcome.rs (Success / Status / Failed)
//!     → handed to http::response for translation
//! ```
//!
//! # Design Decisions
//! - One attempt per inbound request; retry policy belongs to the caller
//! - Whole body buffered before responding; no streaming
//! - Transport failures never escape as errors, only as `Failed` outcomes

pub mod fetcher;
pub mod outcome;

pub use fetcher::{upstream_host, UpstreamFetcher, UpstreamSetupError};
pub use outcome::{FetchError, UpstreamOutcome, UpstreamResponse, FALLBACK_CONTENT_TYPE};
