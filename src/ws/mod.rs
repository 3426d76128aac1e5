//! WebSocket layer: authenticated upgrade and per-connection loops.
//!
//! The endpoint at `/ws` registers each socket with the hub and relays
//! frames between the socket and the registry.

pub mod connection;
pub mod handler;
