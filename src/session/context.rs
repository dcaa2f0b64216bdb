//! Handler context
//!
//! A read-only snapshot of session state passed to `RelayHandler`
//! callbacks. Handlers never mutate sessions directly; they influence
//! behavior through their return values.

use std::net::SocketAddr;

use crate::protocol::PeerId;
use crate::stats::SessionStats;

/// Context passed to `RelayHandler` callbacks
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Unique session id
    pub session_id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Identities registered by this connection so far
    pub identities: Vec<PeerId>,

    /// Counters at the time of the callback
    pub stats: SessionStats,
}

impl SessionContext {
    /// The most recently registered identity, if any
    pub fn identity(&self) -> Option<&PeerId> {
        self.identities.last()
    }
}
