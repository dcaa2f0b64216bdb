//! WebRTC signaling relay
//!
//! A relay that brokers WebRTC session negotiation between peers. Clients
//! connect over WebSocket, declare an identity with a `register` message,
//! and exchange `offer` / `answer` / `ice-candidate` frames that the relay
//! forwards verbatim to the named target. Payloads are opaque: the relay
//! holds no SDP or ICE knowledge, only an in-memory identity-to-connection
//! registry that empties on restart.
//!
//! # Quick start
//!
//! ```no_run
//! use signaling_rs::{DefaultRelayHandler, RelayServer, ServerConfig};
//!
//! # async fn example() -> signaling_rs::error::Result<()> {
//! let config = ServerConfig::default();
//! let server = RelayServer::new(config, DefaultRelayHandler);
//! server.run().await
//! # }
//! ```
//!
//! Custom admission and drop policies plug in through [`RelayHandler`];
//! the default handler preserves the baseline contract (accept everything,
//! no acknowledgments, silent drop of undeliverable messages).

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;

pub use client::{ClientConfig, ClientEvent, RelayClient};
pub use error::{Error, Result};
pub use protocol::{MessageKind, PeerId, RelayNotice, SignalMessage};
pub use registry::{ConnectionHandle, PeerEntry, PeerRegistry};
pub use router::Router;
pub use server::{DefaultRelayHandler, DropAction, RelayHandler, RelayServer, ServerConfig};
pub use session::{SessionContext, SessionPhase, SessionState};
pub use stats::{ServerStats, SessionStats};
