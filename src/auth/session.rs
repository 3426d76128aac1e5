//! Session credential resolution.
//!
//! The hub does not own user or session storage. It only needs to turn a
//! session token into a [`UserId`]; [`SessionLookup`] is that boundary.

use std::fmt;

use async_trait::async_trait;

use crate::domain::UserId;
use crate::error::HubError;

/// Resolves session credentials to user identities.
#[async_trait]
pub trait SessionLookup: fmt::Debug + Send + Sync + 'static {
    /// Returns the user owning `token`, or `None` if the session is unknown
    /// or expired.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Persistence`] if the backing store fails.
    async fn resolve(&self, token: &str) -> Result<Option<UserId>, HubError>;
}
