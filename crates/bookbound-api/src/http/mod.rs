//! HTTP API layer: router, error mapping, response envelope, handlers.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
