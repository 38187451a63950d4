//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → middleware/ (CORS header, request ID, tracing, limits, timeout)
//!     → server.rs (relay handler)
//!     → request.rs (method → preflight / target URL / rejection)
//!     → upstream fetcher (single GET)
//!     → response.rs (outcome → outward status, headers, body)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use middleware::X_REQUEST_ID;
pub use request::{interpret, InterpretError, Interpreted, RelayBody, RelayTarget, TargetEncoding};
pub use response::ErrorBody;
pub use server::{AppState, RelayServer, SystemStatus};
