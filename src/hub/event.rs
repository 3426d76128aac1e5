//! Events consumed by the registry loop.

use tokio::sync::oneshot;

use super::member::{Member, MemberInfo};
use crate::domain::{ConnectionId, Frame, UserId};

/// One unit of work for the registry. Every membership change and every
/// fan-out is expressed as one of these and applied in arrival order.
#[derive(Debug)]
pub(crate) enum HubEvent {
    /// Add a connection and announce it. The registry assigns the id and
    /// replies with it before fanning out the notice.
    Register {
        /// Registry-side record.
        member: Member,
        /// Receives the assigned handle.
        reply: oneshot::Sender<ConnectionId>,
    },
    /// Remove a connection if present and announce its departure.
    Unregister(ConnectionId),
    /// Fan a frame out to every member.
    Broadcast(Frame),
    /// Re-announce a user that already holds a connection.
    Login(UserId),
    /// Close every connection held by a user.
    Logout(UserId),
    /// Report the current membership.
    Members(oneshot::Sender<Vec<MemberInfo>>),
    /// Close every member and stop the loop. Replies with one drain signal
    /// per closed connection.
    Shutdown(oneshot::Sender<Vec<oneshot::Receiver<()>>>),
}
