//! Per-connection records: the registry-side [`Member`] and the
//! connection-side [`Mailbox`].
//!
//! The two halves are created together. The registry holds the producer
//! end of the bounded outbound queue and the close signal; the connection
//! holds the consumer end and a [`DrainGuard`] that fires once its writer
//! has flushed and exited.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use utoipa::ToSchema;

use crate::domain::{ConnectionId, Frame, UserId};

/// Outcome of a non-blocking enqueue onto a member's outbound queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Frame queued.
    Queued,
    /// Queue at capacity: the consumer is stalled.
    Full,
    /// Writer has gone away.
    Closed,
}

/// Registry-side record of one registered connection.
#[derive(Debug)]
pub(crate) struct Member {
    pub(crate) user: UserId,
    pub(crate) connected_at: DateTime<Utc>,
    outbound: mpsc::Sender<Frame>,
    close: oneshot::Sender<()>,
    drained: oneshot::Receiver<()>,
}

impl Member {
    /// Creates the linked registry/connection halves for `user`.
    pub(crate) fn pair(user: UserId, capacity: usize) -> (Self, Mailbox) {
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);
        let (close_tx, close_rx) = oneshot::channel();
        let (drained_tx, drained_rx) = oneshot::channel();
        let member = Self {
            user,
            connected_at: Utc::now(),
            outbound: outbound_tx,
            close: close_tx,
            drained: drained_rx,
        };
        let mailbox = Mailbox {
            outbound: outbound_rx,
            closed: close_rx,
            drain_guard: DrainGuard(Some(drained_tx)),
        };
        (member, mailbox)
    }

    /// Attempts to enqueue `frame` without waiting.
    pub(crate) fn offer(&self, frame: &Frame) -> Delivery {
        match self.outbound.try_send(frame.clone()) {
            Ok(()) => Delivery::Queued,
            Err(TrySendError::Full(_)) => Delivery::Full,
            Err(TrySendError::Closed(_)) => Delivery::Closed,
        }
    }

    /// Closes the outbound queue and signals the connection to stop.
    ///
    /// Returns a receiver that resolves once the connection's writer has
    /// flushed what was already queued and exited.
    pub(crate) fn close(self) -> oneshot::Receiver<()> {
        let Self {
            outbound,
            close,
            drained,
            ..
        } = self;
        drop(outbound);
        let _ = close.send(());
        drained
    }

    pub(crate) fn info(&self, id: ConnectionId) -> MemberInfo {
        MemberInfo {
            id,
            user: self.user.clone(),
            connected_at: self.connected_at,
        }
    }
}

/// Connection-side half handed back by [`super::HubHandle::connect`].
#[derive(Debug)]
pub struct Mailbox {
    /// Frames fanned out by the registry, in registry order.
    pub outbound: mpsc::Receiver<Frame>,
    /// Resolves when the registry has unregistered this connection.
    pub closed: oneshot::Receiver<()>,
    /// Hold for as long as the writer runs; dropping it reports the queue
    /// as drained.
    pub drain_guard: DrainGuard,
}

/// Signals the registry's shutdown path when dropped.
#[derive(Debug)]
pub struct DrainGuard(Option<oneshot::Sender<()>>);

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if let Some(tx) = self.0.take() {
            let _ = tx.send(());
        }
    }
}

/// A successful registration.
#[derive(Debug)]
pub struct Registration {
    /// Handle used to unregister this connection.
    pub id: ConnectionId,
    /// Receiving side of the connection's queue and signals.
    pub mailbox: Mailbox,
}

/// Snapshot of one registered connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct MemberInfo {
    /// Connection handle.
    #[schema(value_type = u64)]
    pub id: ConnectionId,
    /// Owning user.
    #[schema(value_type = String)]
    pub user: UserId,
    /// Registration time.
    pub connected_at: DateTime<Utc>,
}
