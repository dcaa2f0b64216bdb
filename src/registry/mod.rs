//! Connection registry
//!
//! The registry is the single source of truth for "who is reachable now":
//! a process-local, in-memory map from a caller-declared identity to the
//! live connection that registered it. It has no persistence; a restart
//! starts empty and clients must re-register.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<PeerRegistry>
//!                     ┌──────────────────────────┐
//!                     │ peers: HashMap<PeerId,   │
//!                     │   PeerEntry {            │
//!                     │     handle,              │
//!                     │     registered_at,       │
//!                     │   }                      │
//!                     │ >                        │
//!                     └───────────┬──────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [Connection A]          [Connection B]          [Connection C]
//!    register("alice")       resolve("alice")        remove_all_for(c)
//!         │                       │
//!         └──► entry inserted     └──► handle.send_text() ──► writer task
//! ```
//!
//! All access goes through one `tokio::sync::RwLock`, and the lock is
//! never held across an I/O await. Forwarding is an unbounded channel push
//! on the resolved handle, so a slow receiver cannot stall the registry or
//! other connections.

pub mod entry;
pub mod store;

pub use entry::{ConnectionHandle, PeerEntry};
pub use store::PeerRegistry;
