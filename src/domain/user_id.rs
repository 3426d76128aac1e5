//! Opaque user identity resolved from a session credential.
//!
//! [`UserId`] is a newtype over the identifier the persistence layer hands
//! back (a UUID string in practice). The hub never interprets it; it only
//! compares identities for logout and presence attribution.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authenticated user identity.
///
/// Not unique across live connections: one user may hold several
/// simultaneous connections (tabs, devices).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wraps an identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<uuid::Uuid> for UserId {
    fn from(id: uuid::Uuid) -> Self {
        Self(id.to_string())
    }
}
