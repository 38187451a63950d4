//! Offline operator tools.
//!
//! None of these run inside the relay. They produce and consume the data the
//! player ends up handing to the relay:
//! ```text
//! playback API capture → manifest.rs → manifest URLs ─┐
//! host + token         → probe.rs    → playlist URLs ─┤
//!                                                      ▼
//!                              schedule JSON → payload.rs → page payload
//!                                                      │
//!                        player decodes payload, calls /relay?url=…
//! ```

pub mod manifest;
pub mod payload;
pub mod probe;
