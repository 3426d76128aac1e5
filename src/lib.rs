//! # forum-hub
//!
//! Presence and live-notification hub for a forum backend.
//!
//! Accepts many concurrent long-lived WebSocket connections, tracks who is
//! online, and fans chat and presence frames out to every connection
//! without letting one slow reader stall the others. Users, posts,
//! comments, and message storage belong to the surrounding CRUD service;
//! this crate only resolves session credentials to user identities.
//!
//! ## Architecture
//!
//! ```text
//! Clients (WebSocket, REST dispatch)
//!     │
//!     ├── Upgrade handler + read/write loops (ws/)
//!     ├── Presence / broadcast handlers (api/)
//!     │
//!     ├── HubHandle ──► Registry event loop (hub/)
//!     │
//!     └── SessionLookup (auth/) ──► PostgreSQL sessions (persistence/)
//! ```

pub mod api;
pub mod app_state;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod persistence;
pub mod ws;
