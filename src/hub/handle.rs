//! Dispatch API: the only way the rest of the application talks to the
//! registry.
//!
//! [`HubHandle`] is cheap to clone and is passed to the upgrade entrypoint
//! and to REST handlers through [`crate::app_state::AppState`]. Each method
//! turns into one [`HubEvent`] on the registry's channel; none of them
//! touch the member table directly.

use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::event::HubEvent;
use super::member::{Member, MemberInfo, Registration};
use super::registry::{HubExit, Registry};
use crate::domain::{ConnectionId, Frame, UserId};
use crate::error::HubError;

/// Registry tuning.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each connection's outbound queue. A member whose queue
    /// is full when a frame is fanned out is evicted.
    pub outbound_capacity: usize,
    /// Capacity of the registry's event channel. Producers wait when full.
    pub event_capacity: usize,
    /// How long shutdown and per-connection teardown wait for writers to
    /// flush already-queued frames.
    pub shutdown_grace: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            outbound_capacity: 256,
            event_capacity: 1024,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Cloneable handle to a running registry.
#[derive(Debug, Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
    config: HubConfig,
}

impl HubHandle {
    /// Starts the registry loop on the current runtime.
    ///
    /// The returned [`JoinHandle`] completes when the loop stops; a
    /// [`tokio::task::JoinError`] there means the loop panicked.
    #[must_use]
    pub fn spawn(config: HubConfig) -> (Self, JoinHandle<HubExit>) {
        let (events, rx) = mpsc::channel(config.event_capacity.max(1));
        let task = tokio::spawn(Registry::new().run(rx));
        let handle = Self { events, config };
        (handle, task)
    }

    /// Registers a new connection for `user`.
    ///
    /// Every current member, the new one included, is sent a
    /// `user_connected` frame once the registration is processed. The
    /// returned id is assigned by the registry, so id order is registration
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the registry has stopped.
    pub async fn connect(&self, user: UserId) -> Result<Registration, HubError> {
        let (member, mailbox) = Member::pair(user, self.config.outbound_capacity.max(1));
        let (reply, assigned) = oneshot::channel();
        self.send(HubEvent::Register { member, reply }).await?;
        let id = assigned.await.map_err(|_| HubError::HubClosed)?;
        Ok(Registration { id, mailbox })
    }

    /// Unregisters a connection. Unknown or already-removed ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the registry has stopped.
    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.send(HubEvent::Unregister(id)).await
    }

    /// Fans `frame` out to every member, the originating connection included.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the registry has stopped.
    pub async fn broadcast(&self, frame: Frame) -> Result<(), HubError> {
        self.send(HubEvent::Broadcast(frame)).await
    }

    /// Announces `user` as connected if they already hold a connection.
    /// Never creates a connection.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the registry has stopped.
    pub async fn login(&self, user: UserId) -> Result<(), HubError> {
        self.send(HubEvent::Login(user)).await
    }

    /// Closes every connection held by `user`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the registry has stopped.
    pub async fn logout(&self, user: UserId) -> Result<(), HubError> {
        self.send(HubEvent::Logout(user)).await
    }

    /// Returns the current members in registration order.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::HubClosed`] if the registry has stopped.
    pub async fn members(&self) -> Result<Vec<MemberInfo>, HubError> {
        let (tx, rx) = oneshot::channel();
        self.send(HubEvent::Members(tx)).await?;
        rx.await.map_err(|_| HubError::HubClosed)
    }

    /// Closes every connection and stops the registry.
    ///
    /// Waits up to [`HubConfig::shutdown_grace`] for writers to flush what
    /// was already queued. Returns the number of connections closed; a
    /// repeated call is a no-op returning `0`.
    pub async fn shutdown(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.send(HubEvent::Shutdown(tx)).await.is_err() {
            return 0;
        }
        let Ok(drained) = rx.await else {
            return 0;
        };
        let closed = drained.len();
        if tokio::time::timeout(self.config.shutdown_grace, join_all(drained))
            .await
            .is_err()
        {
            tracing::warn!(closed, "shutdown grace elapsed before all writers drained");
        }
        tracing::info!(closed, "hub shut down");
        closed
    }

    /// Returns `true` once the registry no longer accepts events.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.events.is_closed()
    }

    /// Returns the configuration the registry was started with.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    async fn send(&self, event: HubEvent) -> Result<(), HubError> {
        self.events
            .send(event)
            .await
            .map_err(|_| HubError::HubClosed)
    }
}
