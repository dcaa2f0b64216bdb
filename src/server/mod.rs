//! Signaling relay server
//!
//! Accepts WebSocket connections, runs one task per connection, and wires
//! each connection to the shared registry and router. A single slow or
//! misbehaving connection never blocks another: each connection owns its
//! reader loop and writer task, and cross-connection communication happens
//! only through unbounded channel sends.

pub mod config;
pub mod connection;
pub mod handler;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use handler::{DefaultRelayHandler, DropAction, RelayHandler};
pub use listener::RelayServer;
