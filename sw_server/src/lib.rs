//! HTTP/WebSocket front end for Speed War sessions.
//!
//! The binary in `main.rs` wires configuration, storage and the router;
//! the pieces live here so integration tests can drive the router directly.

pub mod api;
pub mod config;
