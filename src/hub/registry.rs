//! The registry event loop: sole owner of the live connection set.
//!
//! [`Registry`] is never shared. It runs inside one task, consumes
//! [`HubEvent`]s in arrival order and applies exactly one per iteration, so
//! membership changes and fan-out never overlap and the member table needs
//! no lock. Nothing in the loop body awaits on I/O; enqueueing onto a
//! member is always a non-blocking `try_send`.
//!
//! # Backpressure
//!
//! A member whose outbound queue is full is evicted on the spot through the
//! same path as an explicit unregister. Its departure notice is fanned out
//! after the frame that overflowed it, which may in turn evict further
//! stalled members; the cascade terminates because every step removes one
//! member.

use std::collections::{BTreeMap, VecDeque};
use std::ops::ControlFlow;

use tokio::sync::{mpsc, oneshot};

use super::event::HubEvent;
use super::member::{Delivery, Member, MemberInfo};
use crate::domain::{ConnectionId, ConnectionIdAllocator, Frame, UserId};

/// Why the registry loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubExit {
    /// A shutdown was requested through the dispatch handle.
    Shutdown,
    /// Every dispatch handle was dropped.
    HandlesDropped,
}

/// Membership table plus the fan-out and eviction logic.
///
/// Ids are assigned here, in the order registrations are applied, so the
/// ordered table enumerates members in registration order.
#[derive(Debug, Default)]
pub(crate) struct Registry {
    members: BTreeMap<ConnectionId, Member>,
    ids: ConnectionIdAllocator,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Drives the loop until shutdown or until all senders are gone.
    pub(crate) async fn run(mut self, mut events: mpsc::Receiver<HubEvent>) -> HubExit {
        tracing::info!("hub registry started");
        loop {
            let Some(event) = events.recv().await else {
                let closed = self.close_all().len();
                tracing::info!(closed, "hub handles dropped; registry stopping");
                break HubExit::HandlesDropped;
            };
            if matches!(event, HubEvent::Shutdown(_)) {
                events.close();
            }
            if let ControlFlow::Break(exit) = self.apply(event) {
                break exit;
            }
        }
    }

    /// Applies a single event.
    pub(crate) fn apply(&mut self, event: HubEvent) -> ControlFlow<HubExit> {
        match event {
            HubEvent::Register { member, reply } => self.register(member, reply),
            HubEvent::Unregister(id) => self.unregister(id),
            HubEvent::Broadcast(frame) => self.fan_out(frame),
            HubEvent::Login(user) => self.login(&user),
            HubEvent::Logout(user) => self.logout(&user),
            HubEvent::Members(reply) => {
                let _ = reply.send(self.snapshot());
            }
            HubEvent::Shutdown(reply) => {
                let drained = self.close_all();
                tracing::info!(closed = drained.len(), "hub registry shutting down");
                let _ = reply.send(drained);
                return ControlFlow::Break(HubExit::Shutdown);
            }
        }
        ControlFlow::Continue(())
    }

    fn register(&mut self, member: Member, reply: oneshot::Sender<ConnectionId>) {
        let id = self.ids.allocate();
        if reply.send(id).is_err() {
            tracing::debug!(user_id = %member.user, "connect abandoned before registration");
            return;
        }
        let frame = Frame::user_connected(&member.user);
        tracing::info!(
            conn_id = %id,
            user_id = %member.user,
            members = self.members.len() + 1,
            "client registered"
        );
        self.members.insert(id, member);
        self.fan_out(frame);
    }

    fn unregister(&mut self, id: ConnectionId) {
        if let Some(frame) = self.remove(id) {
            self.fan_out(frame);
        }
    }

    /// Removes and closes a member, returning its departure notice.
    fn remove(&mut self, id: ConnectionId) -> Option<Frame> {
        let member = self.members.remove(&id)?;
        let frame = Frame::user_disconnected(&member.user);
        tracing::info!(
            conn_id = %id,
            user_id = %member.user,
            members = self.members.len(),
            "client unregistered"
        );
        drop(member.close());
        Some(frame)
    }

    fn fan_out(&mut self, frame: Frame) {
        let mut pending = VecDeque::from([frame]);
        while let Some(frame) = pending.pop_front() {
            let mut dead = Vec::new();
            for (id, member) in &self.members {
                match member.offer(&frame) {
                    Delivery::Queued => {}
                    Delivery::Full => {
                        tracing::warn!(
                            conn_id = %id,
                            user_id = %member.user,
                            "outbound queue full; evicting slow client"
                        );
                        dead.push(*id);
                    }
                    Delivery::Closed => {
                        tracing::debug!(conn_id = %id, "writer gone; evicting client");
                        dead.push(*id);
                    }
                }
            }
            pending.extend(dead.into_iter().filter_map(|id| self.remove(id)));
        }
    }

    fn login(&mut self, user: &UserId) {
        if self.members.values().any(|m| &m.user == user) {
            self.fan_out(Frame::user_connected(user));
        } else {
            tracing::debug!(user_id = %user, "login without live connection");
        }
    }

    fn logout(&mut self, user: &UserId) {
        let ids: Vec<ConnectionId> = self
            .members
            .iter()
            .filter(|(_, m)| &m.user == user)
            .map(|(id, _)| *id)
            .collect();
        tracing::info!(user_id = %user, connections = ids.len(), "logging user out");
        for id in ids {
            self.unregister(id);
        }
    }

    fn close_all(&mut self) -> Vec<oneshot::Receiver<()>> {
        std::mem::take(&mut self.members)
            .into_values()
            .map(Member::close)
            .collect()
    }

    fn snapshot(&self) -> Vec<MemberInfo> {
        self.members
            .iter()
            .map(|(id, member)| member.info(*id))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::FrameKind;
    use crate::hub::member::Mailbox;

    /// Registers `user` and checks it was assigned id `raw`.
    fn join(registry: &mut Registry, raw: u64, user: &str, capacity: usize) -> Mailbox {
        let (member, mailbox) = Member::pair(UserId::new(user), capacity);
        let (reply, mut assigned) = oneshot::channel();
        let flow = registry.apply(HubEvent::Register { member, reply });
        assert!(flow.is_continue());
        assert_eq!(assigned.try_recv(), Ok(ConnectionId::from_raw(raw)));
        mailbox
    }

    fn drain(mailbox: &mut Mailbox) -> Vec<Frame> {
        let mut frames = Vec::new();
        while let Ok(frame) = mailbox.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    fn ids(registry: &Registry) -> Vec<u64> {
        registry.members.keys().map(|id| id.get()).collect()
    }

    #[test]
    fn new_member_receives_its_own_connect_notice() {
        let mut registry = Registry::new();
        let mut a = join(&mut registry, 1, "a", 8);
        assert_eq!(drain(&mut a), vec![Frame::user_connected(&UserId::new("a"))]);

        let mut b = join(&mut registry, 2, "b", 8);
        assert_eq!(drain(&mut a), vec![Frame::user_connected(&UserId::new("b"))]);
        assert_eq!(drain(&mut b), vec![Frame::user_connected(&UserId::new("b"))]);
    }

    #[test]
    fn abandoned_connect_is_not_registered() {
        let mut registry = Registry::new();
        let mut a = join(&mut registry, 1, "a", 8);
        drain(&mut a);

        let (member, _mailbox) = Member::pair(UserId::new("gone"), 8);
        let (reply, assigned) = oneshot::channel();
        drop(assigned);
        let _ = registry.apply(HubEvent::Register { member, reply });

        assert_eq!(ids(&registry), vec![1]);
        assert!(drain(&mut a).is_empty());
    }

    #[test]
    fn broadcast_reaches_every_member_in_order() {
        let mut registry = Registry::new();
        let mut mailboxes: Vec<Mailbox> =
            (1..=3).map(|i| join(&mut registry, i, "u", 16)).collect();
        for mailbox in &mut mailboxes {
            drain(mailbox);
        }

        let _ = registry.apply(HubEvent::Broadcast(Frame::message("one")));
        let _ = registry.apply(HubEvent::Broadcast(Frame::message("two")));

        for mailbox in &mut mailboxes {
            assert_eq!(
                drain(mailbox),
                vec![Frame::message("one"), Frame::message("two")]
            );
        }
    }

    #[test]
    fn full_queue_evicts_only_the_stalled_member() {
        let mut registry = Registry::new();
        // Capacity 1: the connect notice for "slow" fills its queue.
        let mut slow = join(&mut registry, 1, "slow", 1);
        let mut fast = join(&mut registry, 2, "fast", 16);
        drain(&mut fast);
        assert_eq!(ids(&registry), vec![2]);

        let _ = registry.apply(HubEvent::Broadcast(Frame::message("hi")));
        assert_eq!(drain(&mut fast), vec![Frame::message("hi")]);
        assert!(slow.closed.try_recv().is_ok());
        assert_eq!(drain(&mut slow).len(), 1);
    }

    #[test]
    fn eviction_announces_departure_to_remaining_members() {
        let mut registry = Registry::new();
        let mut fast = join(&mut registry, 1, "fast", 16);
        let _slow = join(&mut registry, 2, "slow", 1);
        drain(&mut fast);

        let _ = registry.apply(HubEvent::Broadcast(Frame::message("x")));

        assert_eq!(ids(&registry), vec![1]);
        assert_eq!(
            drain(&mut fast),
            vec![
                Frame::message("x"),
                Frame::user_disconnected(&UserId::new("slow")),
            ]
        );
    }

    #[test]
    fn dropped_mailbox_is_evicted_on_next_fan_out() {
        let mut registry = Registry::new();
        let mut a = join(&mut registry, 1, "a", 8);
        let b = join(&mut registry, 2, "b", 8);
        drop(b);
        drain(&mut a);

        let _ = registry.apply(HubEvent::Broadcast(Frame::message("ping")));
        assert_eq!(ids(&registry), vec![1]);
        let kinds: Vec<FrameKind> = drain(&mut a).into_iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![FrameKind::Message, FrameKind::UserDisconnected]);
    }

    #[test]
    fn unregister_twice_is_a_no_op() {
        let mut registry = Registry::new();
        let mut a = join(&mut registry, 1, "a", 8);
        let _b = join(&mut registry, 2, "b", 8);
        drain(&mut a);

        let _ = registry.apply(HubEvent::Unregister(ConnectionId::from_raw(2)));
        let _ = registry.apply(HubEvent::Unregister(ConnectionId::from_raw(2)));
        let _ = registry.apply(HubEvent::Unregister(ConnectionId::from_raw(99)));

        assert_eq!(ids(&registry), vec![1]);
        assert_eq!(drain(&mut a), vec![Frame::user_disconnected(&UserId::new("b"))]);
    }

    #[test]
    fn logout_closes_every_connection_of_the_user() {
        let mut registry = Registry::new();
        let mut observer = join(&mut registry, 1, "observer", 16);
        let mut tab1 = join(&mut registry, 2, "alice", 16);
        let mut tab2 = join(&mut registry, 3, "alice", 16);
        drain(&mut observer);

        let _ = registry.apply(HubEvent::Logout(UserId::new("alice")));

        assert_eq!(ids(&registry), vec![1]);
        assert!(tab1.closed.try_recv().is_ok());
        assert!(tab2.closed.try_recv().is_ok());
        let gone = Frame::user_disconnected(&UserId::new("alice"));
        assert_eq!(drain(&mut observer), vec![gone.clone(), gone]);
    }

    #[test]
    fn login_announces_only_connected_users() {
        let mut registry = Registry::new();
        let mut a = join(&mut registry, 1, "a", 8);
        drain(&mut a);

        let _ = registry.apply(HubEvent::Login(UserId::new("ghost")));
        assert!(drain(&mut a).is_empty());

        let _ = registry.apply(HubEvent::Login(UserId::new("a")));
        assert_eq!(drain(&mut a), vec![Frame::user_connected(&UserId::new("a"))]);
        assert_eq!(ids(&registry), vec![1]);
    }

    #[test]
    fn shutdown_empties_members_and_breaks() {
        let mut registry = Registry::new();
        let mut a = join(&mut registry, 1, "a", 8);
        let mut b = join(&mut registry, 2, "b", 8);

        let (tx, mut rx) = oneshot::channel();
        let flow = registry.apply(HubEvent::Shutdown(tx));
        assert_eq!(flow, ControlFlow::Break(HubExit::Shutdown));
        assert!(registry.members.is_empty());
        assert!(a.closed.try_recv().is_ok());
        assert!(b.closed.try_recv().is_ok());

        let Ok(drained) = rx.try_recv() else {
            panic!("shutdown did not reply");
        };
        assert_eq!(drained.len(), 2);
    }

    #[tokio::test]
    async fn run_stops_when_handles_drop() {
        let (tx, rx) = mpsc::channel(4);
        let (member, mut mailbox) = Member::pair(UserId::new("a"), 4);
        let (reply, assigned) = oneshot::channel();
        let Ok(()) = tx.send(HubEvent::Register { member, reply }).await else {
            panic!("send failed");
        };
        drop(tx);

        let exit = Registry::new().run(rx).await;
        assert_eq!(exit, HubExit::HandlesDropped);
        assert_eq!(assigned.await, Ok(ConnectionId::from_raw(1)));
        assert!((&mut mailbox.closed).await.is_ok());
    }
}
