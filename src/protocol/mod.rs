//! Signaling wire protocol
//!
//! The relay speaks JSON text frames over a persistent WebSocket. Every
//! frame carries a `type` discriminator and a `sender` identity; every
//! non-`register` frame also carries a `target` identity and a payload
//! field named after its kind (`offer`, `answer`, or `candidate`).
//!
//! Payloads are opaque to the relay. They are SDP descriptions and ICE
//! candidates interpreted only by the WebRTC stacks at the endpoints, so
//! the relay stays agnostic to SDP evolution and trickle-ICE variants.
//!
//! There is no envelope versioning, no compression, and no authentication
//! at this layer.

pub mod message;

pub use message::{MessageKind, PeerId, RelayNotice, SignalMessage};
