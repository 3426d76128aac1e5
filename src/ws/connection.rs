//! Per-connection read and write loops.
//!
//! The writer runs in its own task and drains the connection's bounded
//! outbound queue to the socket. The reader runs in the upgrade task,
//! turns inbound text into registry broadcasts, and is the only place a
//! dead peer is noticed from the network side. Whichever way the
//! connection ends, it funnels into a single `unregister`.

use std::fmt;
use std::num::NonZeroU32;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::{InboundPolicy, RateLimit};
use crate::domain::{ConnectionId, Frame, UserId};
use crate::hub::{DrainGuard, HubHandle, Mailbox, Registration};

/// Why a read loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadExit {
    /// Peer sent a close frame or the stream ended.
    PeerClosed,
    /// Receive failed (I/O or protocol error).
    ReceiveError,
    /// Registry unregistered the connection.
    Unregistered,
    /// Writer task stopped after a write failure.
    WriterStopped,
    /// Registry no longer accepts events.
    HubClosed,
}

/// Registers `user` with the hub and runs the connection until it ends.
///
/// Inbound text beyond `inbound_limit` is dropped.
pub async fn run_connection(
    socket: WebSocket,
    hub: HubHandle,
    user: UserId,
    policy: InboundPolicy,
    inbound_limit: RateLimit,
) {
    let (sink, stream) = socket.split();
    let _ = serve(sink, stream, hub, user, policy, inbound_limit).await;
}

async fn serve<S, St, E>(
    mut sink: S,
    stream: St,
    hub: HubHandle,
    user: UserId,
    policy: InboundPolicy,
    inbound_limit: RateLimit,
) -> ReadExit
where
    S: Sink<Message> + Unpin + Send + 'static,
    S::Error: fmt::Display,
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let Registration { id, mailbox } = match hub.connect(user.clone()).await {
        Ok(registration) => registration,
        Err(err) => {
            tracing::warn!(user_id = %user, error = %err, "could not register connection");
            let _ = sink.send(Message::Close(None)).await;
            return ReadExit::HubClosed;
        }
    };
    let Mailbox {
        outbound,
        mut closed,
        drain_guard,
    } = mailbox;

    let mut writer = tokio::spawn(write_loop(sink, outbound, drain_guard, id));
    let limiter = inbound_limiter(inbound_limit);

    let exit = read_loop(
        stream,
        &hub,
        id,
        policy,
        limiter.as_ref(),
        &mut closed,
        &mut writer,
    )
    .await;
    tracing::info!(conn_id = %id, user_id = %user, reason = ?exit, "connection ending");

    if exit != ReadExit::Unregistered {
        let _ = hub.unregister(id).await;
    }
    if !writer.is_finished()
        && tokio::time::timeout(hub.config().shutdown_grace, &mut writer)
            .await
            .is_err()
    {
        tracing::warn!(conn_id = %id, "writer did not drain in time; aborting");
        writer.abort();
    }
    exit
}

fn inbound_limiter(limit: RateLimit) -> Option<DefaultDirectRateLimiter> {
    let burst = NonZeroU32::new(limit.burst)?;
    let quota = Quota::with_period(limit.period)?.allow_burst(burst);
    Some(RateLimiter::direct(quota))
}

async fn read_loop<St, E>(
    mut stream: St,
    hub: &HubHandle,
    id: ConnectionId,
    policy: InboundPolicy,
    limiter: Option<&DefaultDirectRateLimiter>,
    closed: &mut oneshot::Receiver<()>,
    writer: &mut JoinHandle<()>,
) -> ReadExit
where
    St: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    loop {
        tokio::select! {
            _ = &mut *closed => return ReadExit::Unregistered,
            _ = &mut *writer => return ReadExit::WriterStopped,
            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    if limiter.is_some_and(|limiter| limiter.check().is_err()) {
                        tracing::debug!(conn_id = %id, "inbound rate limit hit; dropping frame");
                        continue;
                    }
                    let Some(frame) = inbound_frame(text.as_str(), policy) else {
                        tracing::debug!(conn_id = %id, "dropping inbound frame rejected by policy");
                        continue;
                    };
                    if hub.broadcast(frame).await.is_err() {
                        return ReadExit::HubClosed;
                    }
                }
                Some(Ok(Message::Close(reason))) => {
                    tracing::debug!(conn_id = %id, ?reason, "peer closed");
                    return ReadExit::PeerClosed;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::warn!(conn_id = %id, error = %err, "websocket receive error");
                    return ReadExit::ReceiveError;
                }
                None => return ReadExit::PeerClosed,
            },
        }
    }
}

async fn write_loop<S>(
    mut sink: S,
    mut outbound: mpsc::Receiver<Frame>,
    _drain_guard: DrainGuard,
    id: ConnectionId,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    while let Some(frame) = outbound.recv().await {
        let json = match frame.to_json() {
            Ok(json) => json,
            Err(err) => {
                tracing::error!(conn_id = %id, error = %err, "frame serialization failed");
                continue;
            }
        };
        if let Err(err) = sink.send(Message::text(json)).await {
            tracing::warn!(conn_id = %id, error = %err, "websocket write failed");
            return;
        }
    }
    tracing::debug!(conn_id = %id, "outbound queue closed; closing socket");
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}

/// Turns one inbound text message into the frame to broadcast, or `None`
/// if `policy` rejects it.
///
/// Under [`InboundPolicy::Wrap`] the raw text becomes the content of a
/// `message` frame. Under [`InboundPolicy::Envelope`] the text must already
/// be a `message` frame; presence frames and unknown types are refused so
/// clients cannot forge presence.
#[must_use]
pub fn inbound_frame(text: &str, policy: InboundPolicy) -> Option<Frame> {
    match policy {
        InboundPolicy::Wrap => Some(Frame::message(text)),
        InboundPolicy::Envelope => serde_json::from_str::<Frame>(text)
            .ok()
            .filter(|frame| !frame.kind.is_presence()),
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::io;
    use std::time::Duration;

    use futures_util::{sink, stream};

    use super::*;
    use crate::domain::FrameKind;
    use crate::hub::HubConfig;

    const UNLIMITED: RateLimit = RateLimit {
        period: Duration::from_millis(1),
        burst: 1000,
    };

    fn spawn_hub() -> HubHandle {
        let (hub, _task) = HubHandle::spawn(HubConfig {
            outbound_capacity: 16,
            event_capacity: 64,
            shutdown_grace: Duration::from_millis(500),
        });
        hub
    }

    /// Drains everything `mailbox` has received once the hub has caught up.
    async fn received(hub: &HubHandle, mailbox: &mut Mailbox) -> Vec<Frame> {
        let _ = hub.members().await;
        let mut frames = Vec::new();
        while let Ok(frame) = mailbox.outbound.try_recv() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn write_failure_stops_reader_and_unregisters_once() {
        let hub = spawn_hub();
        let Ok(mut peer) = hub.connect(UserId::new("peer")).await else {
            panic!("peer connect failed");
        };

        let broken = Box::pin(sink::unfold((), |(), _msg: Message| async {
            Err::<(), _>(io::Error::other("broken pipe"))
        }));
        let silent = stream::pending::<Result<Message, io::Error>>();
        let exit = serve(
            broken,
            silent,
            hub.clone(),
            UserId::new("flaky"),
            InboundPolicy::Wrap,
            UNLIMITED,
        )
        .await;
        assert_eq!(exit, ReadExit::WriterStopped);

        let frames = received(&hub, &mut peer.mailbox).await;
        let gone = Frame::user_disconnected(&UserId::new("flaky"));
        assert_eq!(frames.iter().filter(|f| **f == gone).count(), 1);
        assert_eq!(frames.last(), Some(&gone));

        let Ok(members) = hub.members().await else {
            panic!("members failed");
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members.first().map(|m| m.id), Some(peer.id));
    }

    #[tokio::test]
    async fn inbound_text_beyond_budget_is_dropped() {
        let hub = spawn_hub();
        let Ok(mut peer) = hub.connect(UserId::new("peer")).await else {
            panic!("peer connect failed");
        };

        let chatter = stream::iter(
            ["a", "b", "c", "d", "e"].map(|text| Ok::<_, io::Error>(Message::text(text))),
        );
        let budget = RateLimit::new(Duration::from_secs(60), 2);
        let exit = serve(
            sink::drain(),
            chatter,
            hub.clone(),
            UserId::new("chatty"),
            InboundPolicy::Wrap,
            budget,
        )
        .await;
        assert_eq!(exit, ReadExit::PeerClosed);

        let messages: Vec<String> = received(&hub, &mut peer.mailbox)
            .await
            .into_iter()
            .filter(|f| f.kind == FrameKind::Message)
            .map(|f| f.content)
            .collect();
        assert_eq!(messages, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn closed_hub_refuses_connection() {
        let hub = spawn_hub();
        assert_eq!(hub.shutdown().await, 0);

        let exit = serve(
            sink::drain(),
            stream::pending::<Result<Message, io::Error>>(),
            hub,
            UserId::new("late"),
            InboundPolicy::Wrap,
            UNLIMITED,
        )
        .await;
        assert_eq!(exit, ReadExit::HubClosed);
    }

    #[test]
    fn wrap_keeps_raw_text_as_content() {
        let raw = r#"{"receiver":"u3","text":"hi"}"#;
        assert_eq!(
            inbound_frame(raw, InboundPolicy::Wrap),
            Some(Frame::message(raw))
        );
    }

    #[test]
    fn envelope_accepts_message_frames() {
        let raw = r#"{"type":"message","content":"hi"}"#;
        assert_eq!(
            inbound_frame(raw, InboundPolicy::Envelope),
            Some(Frame::message("hi"))
        );
    }

    #[test]
    fn envelope_rejects_presence_unknown_and_malformed() {
        for raw in [
            r#"{"type":"user_connected","content":"mallory"}"#,
            r#"{"type":"typing","content":""}"#,
            "not json",
        ] {
            assert_eq!(inbound_frame(raw, InboundPolicy::Envelope), None, "{raw}");
        }
    }
}
