//! Cross-origin stream relay library.
//!
//! Fetches a caller-supplied URL on behalf of a browser media player and
//! returns the bytes with a wildcard cross-origin header.

// Core subsystems
pub mod config;
pub mod http;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod net;
pub mod observability;

// Offline operator utilities
pub mod tools;

pub use config::RelayConfig;
pub use http::RelayServer;
pub use lifecycle::Shutdown;
