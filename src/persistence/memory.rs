//! In-memory session store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::auth::SessionLookup;
use crate::domain::UserId;
use crate::error::HubError;

/// Process-local token → user map.
///
/// Tokens are random UUID v4 strings. Nothing is persisted.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, UserId>>,
}

impl MemorySessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a session for `user` and returns its token.
    pub async fn issue(&self, user: UserId) -> String {
        let token = uuid::Uuid::new_v4().to_string();
        self.sessions.write().await.insert(token.clone(), user);
        token
    }

    /// Ends a session. Returns `true` if the token existed.
    pub async fn revoke(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[async_trait]
impl SessionLookup for MemorySessionStore {
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, HubError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issued_token_resolves_until_revoked() {
        let store = MemorySessionStore::new();
        let token = store.issue(UserId::new("alice")).await;

        let Ok(user) = store.resolve(&token).await else {
            panic!("lookup failed");
        };
        assert_eq!(user, Some(UserId::new("alice")));

        assert!(store.revoke(&token).await);
        assert!(!store.revoke(&token).await);
        let Ok(user) = store.resolve(&token).await else {
            panic!("lookup failed");
        };
        assert_eq!(user, None);
    }

    #[tokio::test]
    async fn tokens_are_unique_per_session() {
        let store = MemorySessionStore::new();
        let a = store.issue(UserId::new("bob")).await;
        let b = store.issue(UserId::new("bob")).await;
        assert_ne!(a, b);
    }
}
