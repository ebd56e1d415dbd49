//! API layer - HTTP and WebSocket entry points.

pub mod http;
pub mod ws;
