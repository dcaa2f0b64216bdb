//! Signaling client
//!
//! Client-side counterpart to the relay: connects, registers an identity,
//! and exchanges typed signaling messages. Used by the demos and the
//! integration tests; browser peers speak the same wire protocol natively.

pub mod config;
pub mod peer;

pub use config::ClientConfig;
pub use peer::{ClientEvent, RelayClient};
