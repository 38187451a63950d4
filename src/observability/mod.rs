//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Relay handler and upstream fetcher produce:
//!     → logging.rs (structured log events, request-scoped spans)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID recorded on every request span
//! - Target URLs are never logged in full; only their host

pub mod logging;
pub mod metrics;
