//! Network layer subsystem.
//!
//! Plain TCP listeners are bound directly with Tokio; this module only covers
//! the optional TLS termination configured under `listener.tls`.

pub mod tls;

pub use tls::load_tls_config;
