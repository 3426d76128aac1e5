//! Stable handle for one live connection.
//!
//! The registry keys its membership table by [`ConnectionId`] instead of by
//! the connection object itself, so membership can be enumerated, compared
//! and referred to after the socket is gone.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identifier of a single registered connection.
///
/// Allocated from a monotonically increasing counter; never reused within
/// one process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a `ConnectionId` from a raw value.
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Monotonic allocator for [`ConnectionId`]s, owned by the registry.
#[derive(Debug)]
pub struct ConnectionIdAllocator {
    next: AtomicU64,
}

impl ConnectionIdAllocator {
    /// Creates an allocator whose first id is `1`.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Returns the next unused id.
    pub fn allocate(&self) -> ConnectionId {
        ConnectionId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ConnectionIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_increasing_ids() {
        let alloc = ConnectionIdAllocator::new();
        let a = alloc.allocate();
        let b = alloc.allocate();
        assert_eq!(a.get(), 1);
        assert!(b > a);
    }

    #[test]
    fn display_has_prefix() {
        assert_eq!(ConnectionId::from_raw(7).to_string(), "conn-7");
    }
}
