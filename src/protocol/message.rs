//! Signaling message types
//!
//! This module defines the identity key used for routing and the tagged
//! message union exchanged over the wire.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-chosen identity naming a peer for the duration of a session
///
/// The string is opaque: it is not validated for emptiness or collision,
/// and uniqueness is not enforced (a later registration silently replaces
/// an earlier one with the same identity).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    /// Create a new peer identity
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// View the identity as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identity is the empty string (accepted, but worth logging)
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for PeerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for PeerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Discriminator for the four wire message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Register,
    Offer,
    Answer,
    IceCandidate,
}

impl MessageKind {
    /// The `type` string used on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Register => "register",
            MessageKind::Offer => "offer",
            MessageKind::Answer => "answer",
            MessageKind::IceCandidate => "ice-candidate",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signaling message, parsed at the boundary
///
/// `offer`, `answer`, and `candidate` payloads are carried as opaque JSON
/// values; the relay never inspects them. Unknown extra fields on a frame
/// are tolerated and ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SignalMessage {
    /// Bind the sending connection to an identity. Never forwarded.
    Register { sender: PeerId },
    /// Session description offer, relayed verbatim to `target`
    Offer {
        sender: PeerId,
        target: PeerId,
        offer: Value,
    },
    /// Session description answer, relayed verbatim to `target`
    Answer {
        sender: PeerId,
        target: PeerId,
        answer: Value,
    },
    /// Connectivity candidate, relayed verbatim to `target`
    IceCandidate {
        sender: PeerId,
        target: PeerId,
        candidate: Value,
    },
}

impl SignalMessage {
    /// Parse a text frame into a message
    ///
    /// Fails on invalid JSON, an unknown `type`, or a missing required
    /// field. Callers drop the single frame and keep the connection open.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Serialize to the wire representation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Which of the four kinds this message is
    pub fn kind(&self) -> MessageKind {
        match self {
            SignalMessage::Register { .. } => MessageKind::Register,
            SignalMessage::Offer { .. } => MessageKind::Offer,
            SignalMessage::Answer { .. } => MessageKind::Answer,
            SignalMessage::IceCandidate { .. } => MessageKind::IceCandidate,
        }
    }

    /// The declared sender identity
    pub fn sender(&self) -> &PeerId {
        match self {
            SignalMessage::Register { sender }
            | SignalMessage::Offer { sender, .. }
            | SignalMessage::Answer { sender, .. }
            | SignalMessage::IceCandidate { sender, .. } => sender,
        }
    }

    /// The routing target; `None` only for `register`
    pub fn target(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Register { .. } => None,
            SignalMessage::Offer { target, .. }
            | SignalMessage::Answer { target, .. }
            | SignalMessage::IceCandidate { target, .. } => Some(target),
        }
    }
}

/// Relay-originated notice, sent only when a handler opts into
/// `DropAction::NotifySender`
///
/// The baseline contract stays no-ack: nothing of this kind is emitted
/// under the default drop policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RelayNotice {
    /// A message could not be delivered because `target` is not registered
    DeliveryFailure { target: PeerId },
}
