//! Shared DTO types used across multiple endpoints.

use serde::Serialize;
use utoipa::ToSchema;

/// Acknowledgement for dispatch endpoints.
///
/// The event has been queued on the hub; delivery to sockets happens
/// asynchronously and is not acknowledged.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DispatchAccepted {
    /// Always `"accepted"`.
    pub status: String,
    /// Dispatched event name (e.g. `"logout"`).
    pub event: String,
}

impl DispatchAccepted {
    /// Acknowledges the named event.
    #[must_use]
    pub fn new(event: &str) -> Self {
        Self {
            status: "accepted".to_string(),
            event: event.to_string(),
        }
    }
}
