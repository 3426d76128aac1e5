//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::auth::SessionLookup;
use crate::config::{InboundPolicy, RateLimit, ServerConfig};
use crate::hub::HubHandle;

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Dispatch handle to the connection registry.
    pub hub: HubHandle,
    /// Session credential resolver.
    pub sessions: Arc<dyn SessionLookup>,
    /// Name of the session cookie.
    pub session_cookie: Arc<str>,
    /// Inbound WebSocket message size limit in bytes.
    pub max_frame_bytes: usize,
    /// Treatment of inbound text frames.
    pub inbound_policy: InboundPolicy,
    /// Per-IP throttle on the broadcast endpoint.
    pub broadcast_limit: RateLimit,
    /// Per-connection budget for inbound WebSocket text.
    pub inbound_limit: RateLimit,
}

impl AppState {
    /// Assembles the state from its collaborators and the server config.
    #[must_use]
    pub fn new(hub: HubHandle, sessions: Arc<dyn SessionLookup>, config: &ServerConfig) -> Self {
        Self {
            hub,
            sessions,
            session_cookie: Arc::from(config.session_cookie_name.as_str()),
            max_frame_bytes: config.max_frame_bytes,
            inbound_policy: config.inbound_policy,
            broadcast_limit: config.broadcast_limit(),
            inbound_limit: config.inbound_limit(),
        }
    }
}
