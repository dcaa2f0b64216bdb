//! Registry entry types
//!
//! A registry entry pairs an identity with a non-owning handle to the
//! connection that registered it. The connection itself is owned by its
//! transport task; the handle only carries the session id and the sender
//! half of the connection's outbound channel.

use std::time::Instant;

use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};

/// Non-owning reference to a live connection
///
/// Cheap to clone; equality is by session id, so every clone of a
/// connection's handle compares equal regardless of which task holds it.
/// Sends are fire-and-forget pushes into the connection's writer task and
/// never block.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    session_id: u64,
    tx: mpsc::UnboundedSender<Message>,
}

impl ConnectionHandle {
    /// Create a handle from a session id and the outbound channel sender
    pub fn new(session_id: u64, tx: mpsc::UnboundedSender<Message>) -> Self {
        Self { session_id, tx }
    }

    /// Unique id of the connection this handle refers to
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Queue a text frame for delivery
    ///
    /// Returns `false` if the connection's writer task has already gone
    /// away; callers treat that the same as an unknown target.
    pub fn send_text(&self, frame: Utf8Bytes) -> bool {
        self.tx.send(Message::Text(frame)).is_ok()
    }

    /// Queue an arbitrary WebSocket message for delivery
    pub fn send(&self, message: Message) -> bool {
        self.tx.send(message).is_ok()
    }

    /// Whether the connection's writer task is still accepting frames
    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }
}

impl PartialEq for ConnectionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.session_id == other.session_id
    }
}

impl Eq for ConnectionHandle {}

/// Entry for a single registered identity
#[derive(Debug, Clone)]
pub struct PeerEntry {
    /// Handle to the connection that registered the identity
    pub handle: ConnectionHandle,

    /// When the registration happened
    pub registered_at: Instant,
}

impl PeerEntry {
    /// Create a new entry for the given connection
    pub fn new(handle: ConnectionHandle) -> Self {
        Self {
            handle,
            registered_at: Instant::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(session_id: u64) -> (ConnectionHandle, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(session_id, tx), rx)
    }

    #[test]
    fn test_send_text_delivers_frame() {
        let (h, mut rx) = handle(1);

        assert!(h.send_text("hello".into()));

        match rx.try_recv().unwrap() {
            Message::Text(text) => assert_eq!(text.as_str(), "hello"),
            other => panic!("expected text frame, got {:?}", other),
        }
    }

    #[test]
    fn test_send_after_receiver_dropped() {
        let (h, rx) = handle(1);
        drop(rx);

        assert!(!h.is_open());
        assert!(!h.send_text("hello".into()));
    }

    #[test]
    fn test_equality_is_by_session_id() {
        let (a, _rx_a) = handle(1);
        let (b, _rx_b) = handle(1);
        let (c, _rx_c) = handle(2);

        // Same session id compares equal even across distinct channels
        assert_eq!(a, b);
        assert_eq!(a, a.clone());
        assert_ne!(a, c);
    }
}
