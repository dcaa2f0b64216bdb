//! Signaling router
//!
//! One router instance is shared by every connection task. Each inbound
//! text frame is parsed just enough to route it: `register` binds the
//! sending connection in the registry, everything else is resolved by
//! `target` and the ORIGINAL frame is forwarded untouched. The relay is a
//! dumb pipe by design: payloads are never interpreted here.
//!
//! ```text
//!   frame ──► parse ──┬─► register ──► registry.register(identity, conn)
//!                     │                       (no acknowledgment)
//!                     └─► offer / answer / ice-candidate
//!                            │
//!                            ├─ registry.resolve(target) hit ──► forward raw frame
//!                            └─ miss ──► drop (DropAction policy)
//! ```
//!
//! Registration order is not enforced: a connection that never registered
//! can still have its messages forwarded if the target resolves. Malformed
//! frames and unknown targets drop the single message; the connection is
//! never closed for either.

use std::sync::Arc;

use tokio_tungstenite::tungstenite::Utf8Bytes;

use crate::protocol::{PeerId, RelayNotice, SignalMessage};
use crate::registry::{ConnectionHandle, PeerRegistry};
use crate::server::handler::{DropAction, RelayHandler};
use crate::session::SessionState;
use crate::stats::RelayStats;

/// Per-message protocol logic, shared across all connection tasks
pub struct Router<H: RelayHandler> {
    registry: Arc<PeerRegistry>,
    handler: Arc<H>,
    stats: Arc<RelayStats>,
}

impl<H: RelayHandler> Router<H> {
    /// Create a router over the given registry, handler, and counters
    pub fn new(registry: Arc<PeerRegistry>, handler: Arc<H>, stats: Arc<RelayStats>) -> Self {
        Self {
            registry,
            handler,
            stats,
        }
    }

    /// The registry this router routes against
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Process one inbound text frame from a connection
    pub async fn handle_frame(
        &self,
        state: &mut SessionState,
        conn: &ConnectionHandle,
        raw: Utf8Bytes,
    ) {
        state.stats.messages_received += 1;
        state.stats.bytes_received += raw.len() as u64;

        let message = match SignalMessage::parse(raw.as_str()) {
            Ok(message) => message,
            Err(error) => {
                state.stats.dropped_malformed += 1;
                self.stats.record_drop();
                tracing::debug!(
                    session_id = state.id,
                    error = %error,
                    "Dropping malformed frame"
                );
                self.handler.on_malformed(&state.context(), &error);
                return;
            }
        };

        match message {
            SignalMessage::Register { sender } => self.register(state, conn, sender).await,
            message => self.forward(state, conn, message, raw).await,
        }
    }

    /// Handle a `register`: mutate the registry, send nothing back
    async fn register(&self, state: &mut SessionState, conn: &ConnectionHandle, identity: PeerId) {
        if !self.handler.on_register(&state.context(), &identity).await {
            tracing::info!(
                session_id = state.id,
                identity = %identity,
                "Registration refused by handler"
            );
            return;
        }

        if identity.is_empty() {
            tracing::warn!(session_id = state.id, "Registering empty identity");
        }

        let displaced = self.registry.register(identity.clone(), conn.clone()).await;
        if let Some(previous) = displaced {
            if previous.handle != *conn && previous.handle.is_open() {
                // The stale connection stays open but unroutable until it
                // closes on its own.
                tracing::warn!(
                    identity = %identity,
                    previous_session_id = previous.handle.session_id(),
                    session_id = conn.session_id(),
                    "Registration displaced a live connection"
                );
            }
        }

        state.on_register(identity);
        self.stats.record_registration();
    }

    /// Forward a targeted message, or drop it per the handler's policy
    async fn forward(
        &self,
        state: &mut SessionState,
        conn: &ConnectionHandle,
        message: SignalMessage,
        raw: Utf8Bytes,
    ) {
        // Every non-register kind carries a target
        let Some(target) = message.target() else {
            return;
        };

        let Some(peer) = self.registry.resolve(target).await else {
            self.drop_message(state, conn, &message).await;
            return;
        };

        let frame_len = raw.len() as u64;
        if peer.send_text(raw) {
            state.stats.messages_forwarded += 1;
            state.stats.bytes_forwarded += frame_len;
            self.stats.record_forward();
            tracing::trace!(
                kind = %message.kind(),
                sender = %message.sender(),
                target = %target,
                session_id = state.id,
                "Forwarded"
            );
            self.handler.on_forward(&state.context(), &message).await;
        } else {
            // Resolved but the target's writer already went away; the
            // registry entry disappears with its disconnect notification.
            self.drop_message(state, conn, &message).await;
        }
    }

    /// Apply the drop policy to an undeliverable message
    async fn drop_message(
        &self,
        state: &mut SessionState,
        conn: &ConnectionHandle,
        message: &SignalMessage,
    ) {
        state.stats.dropped_unknown_target += 1;
        self.stats.record_drop();
        tracing::debug!(
            kind = %message.kind(),
            sender = %message.sender(),
            target = message.target().map(PeerId::as_str).unwrap_or_default(),
            session_id = state.id,
            "Dropping message for unresolvable target"
        );

        if self.handler.unknown_target_action() == DropAction::NotifySender {
            if let Some(target) = message.target() {
                let notice = RelayNotice::DeliveryFailure {
                    target: target.clone(),
                };
                if let Ok(json) = serde_json::to_string(&notice) {
                    conn.send_text(json.into());
                }
            }
        }

        self.handler.on_drop(&state.context(), message);
    }
}

impl<H: RelayHandler> Clone for Router<H> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            handler: Arc::clone(&self.handler),
            stats: Arc::clone(&self.stats),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;
    use crate::server::handler::DefaultRelayHandler;

    fn addr() -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000)
    }

    fn conn(session_id: u64) -> (ConnectionHandle, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(session_id, tx), rx)
    }

    fn router<H: RelayHandler>(handler: H) -> Router<H> {
        Router::new(
            Arc::new(PeerRegistry::new()),
            Arc::new(handler),
            Arc::new(RelayStats::new()),
        )
    }

    fn text(rx: &mut mpsc::UnboundedReceiver<Message>) -> Option<String> {
        match rx.try_recv() {
            Ok(Message::Text(t)) => Some(t.as_str().to_string()),
            Ok(other) => panic!("expected text frame, got {:?}", other),
            Err(_) => None,
        }
    }

    #[tokio::test]
    async fn test_register_then_forward() {
        let router = router(DefaultRelayHandler);
        let (conn_a, _rx_a) = conn(1);
        let (conn_b, mut rx_b) = conn(2);
        let mut state_a = SessionState::new(1, addr());
        let mut state_b = SessionState::new(2, addr());

        router
            .handle_frame(&mut state_b, &conn_b, r#"{"type":"register","sender":"bob"}"#.into())
            .await;
        assert!(state_b.is_registered());

        let offer = r#"{"type":"offer","sender":"alice","target":"bob","offer":{"sdp":"v=0"}}"#;
        router.handle_frame(&mut state_a, &conn_a, offer.into()).await;

        assert_eq!(text(&mut rx_b).unwrap(), offer);
        assert_eq!(state_a.stats.messages_forwarded, 1);
    }

    #[tokio::test]
    async fn test_forwarding_is_verbatim() {
        let router = router(DefaultRelayHandler);
        let (conn_a, _rx_a) = conn(1);
        let (conn_b, mut rx_b) = conn(2);
        let mut state_a = SessionState::new(1, addr());
        let mut state_b = SessionState::new(2, addr());

        router
            .handle_frame(&mut state_b, &conn_b, r#"{"type":"register","sender":"bob"}"#.into())
            .await;

        // Unusual spacing and key order must survive untouched
        let odd = "{ \"offer\": {\"sdp\":\"v=0\"},\t\"target\":\"bob\", \"sender\":\"alice\", \"type\":\"offer\" }";
        router.handle_frame(&mut state_a, &conn_a, odd.into()).await;

        assert_eq!(text(&mut rx_b).unwrap(), odd);
    }

    #[tokio::test]
    async fn test_unregistered_sender_can_still_be_routed() {
        let router = router(DefaultRelayHandler);
        let (conn_a, _rx_a) = conn(1);
        let (conn_b, mut rx_b) = conn(2);
        let mut state_a = SessionState::new(1, addr());
        let mut state_b = SessionState::new(2, addr());

        router
            .handle_frame(&mut state_b, &conn_b, r#"{"type":"register","sender":"bob"}"#.into())
            .await;

        // conn_a never registered, but its message targets a known peer
        let msg = r#"{"type":"ice-candidate","sender":"alice","target":"bob","candidate":{}}"#;
        router.handle_frame(&mut state_a, &conn_a, msg.into()).await;

        assert!(!state_a.is_registered());
        assert_eq!(text(&mut rx_b).unwrap(), msg);
    }

    #[tokio::test]
    async fn test_unknown_target_has_no_side_effects() {
        let router = router(DefaultRelayHandler);
        let (conn_a, mut rx_a) = conn(1);
        let mut state_a = SessionState::new(1, addr());

        let msg = r#"{"type":"offer","sender":"alice","target":"ghost","offer":{}}"#;
        router.handle_frame(&mut state_a, &conn_a, msg.into()).await;

        // Nothing sent anywhere, not even to the sender
        assert!(text(&mut rx_a).is_none());
        assert_eq!(state_a.stats.dropped_unknown_target, 1);
        assert_eq!(state_a.stats.messages_forwarded, 0);
    }

    #[tokio::test]
    async fn test_register_never_forwards() {
        let router = router(DefaultRelayHandler);
        let (conn_a, _rx_a) = conn(1);
        let (conn_b, mut rx_b) = conn(2);
        let mut state_a = SessionState::new(1, addr());
        let mut state_b = SessionState::new(2, addr());

        router
            .handle_frame(&mut state_b, &conn_b, r#"{"type":"register","sender":"bob"}"#.into())
            .await;
        // A registering as "bob" overwrites, but nothing reaches B
        router
            .handle_frame(&mut state_a, &conn_a, r#"{"type":"register","sender":"bob"}"#.into())
            .await;

        assert!(text(&mut rx_b).is_none());
    }

    #[tokio::test]
    async fn test_last_registration_wins_routing() {
        let router = router(DefaultRelayHandler);
        let (conn_old, mut rx_old) = conn(1);
        let (conn_new, mut rx_new) = conn(2);
        let (conn_sender, _rx_sender) = conn(3);
        let mut state_old = SessionState::new(1, addr());
        let mut state_new = SessionState::new(2, addr());
        let mut state_sender = SessionState::new(3, addr());

        let register = r#"{"type":"register","sender":"bob"}"#;
        router.handle_frame(&mut state_old, &conn_old, register.into()).await;
        router.handle_frame(&mut state_new, &conn_new, register.into()).await;

        let msg = r#"{"type":"offer","sender":"alice","target":"bob","offer":{}}"#;
        router.handle_frame(&mut state_sender, &conn_sender, msg.into()).await;

        assert!(text(&mut rx_old).is_none());
        assert_eq!(text(&mut rx_new).unwrap(), msg);
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection_usable() {
        let router = router(DefaultRelayHandler);
        let (conn_a, _rx_a) = conn(1);
        let (conn_b, mut rx_b) = conn(2);
        let mut state_a = SessionState::new(1, addr());
        let mut state_b = SessionState::new(2, addr());

        router
            .handle_frame(&mut state_b, &conn_b, r#"{"type":"register","sender":"bob"}"#.into())
            .await;

        router.handle_frame(&mut state_a, &conn_a, "{not json".into()).await;
        assert_eq!(state_a.stats.dropped_malformed, 1);

        let msg = r#"{"type":"offer","sender":"alice","target":"bob","offer":{}}"#;
        router.handle_frame(&mut state_a, &conn_a, msg.into()).await;
        assert_eq!(text(&mut rx_b).unwrap(), msg);
    }

    #[tokio::test]
    async fn test_forward_to_closed_peer_counts_as_drop() {
        let router = router(DefaultRelayHandler);
        let (conn_a, _rx_a) = conn(1);
        let (conn_b, rx_b) = conn(2);
        let mut state_a = SessionState::new(1, addr());
        let mut state_b = SessionState::new(2, addr());

        router
            .handle_frame(&mut state_b, &conn_b, r#"{"type":"register","sender":"bob"}"#.into())
            .await;
        drop(rx_b);

        let msg = r#"{"type":"offer","sender":"alice","target":"bob","offer":{}}"#;
        router.handle_frame(&mut state_a, &conn_a, msg.into()).await;

        assert_eq!(state_a.stats.dropped_unknown_target, 1);
        assert_eq!(state_a.stats.messages_forwarded, 0);
    }

    struct NotifyingHandler;

    impl RelayHandler for NotifyingHandler {
        fn unknown_target_action(&self) -> DropAction {
            DropAction::NotifySender
        }
    }

    #[tokio::test]
    async fn test_notify_sender_policy_sends_delivery_failure() {
        let router = router(NotifyingHandler);
        let (conn_a, mut rx_a) = conn(1);
        let mut state_a = SessionState::new(1, addr());

        let msg = r#"{"type":"offer","sender":"alice","target":"ghost","offer":{}}"#;
        router.handle_frame(&mut state_a, &conn_a, msg.into()).await;

        let notice = text(&mut rx_a).unwrap();
        assert_eq!(notice, r#"{"type":"delivery-failure","target":"ghost"}"#);
    }

    struct RefusingHandler;

    impl RelayHandler for RefusingHandler {
        async fn on_register(&self, _ctx: &crate::session::SessionContext, _identity: &PeerId) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn test_handler_can_refuse_registration() {
        let router = router(RefusingHandler);
        let (conn_a, mut rx_a) = conn(1);
        let mut state_a = SessionState::new(1, addr());

        router
            .handle_frame(&mut state_a, &conn_a, r#"{"type":"register","sender":"alice"}"#.into())
            .await;

        assert!(!state_a.is_registered());
        assert!(!router.registry().contains(&PeerId::from("alice")).await);
        // Refusal is silent, like everything else here
        assert!(text(&mut rx_a).is_none());
    }
}
