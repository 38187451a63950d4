//! Cross-cutting HTTP middleware.

pub mod cors;
pub mod request_id;

pub use cors::allow_any_origin;
pub use request_id::{request_id_layer, request_id_of, X_REQUEST_ID};
