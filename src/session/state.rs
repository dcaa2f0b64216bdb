//! Session state machine
//!
//! Tracks a connection from accept to close. Registration is not a
//! gate: the router forwards any message with a resolvable target
//! regardless of the sending session's phase, so the phase exists for
//! observability and cleanup, not for admission control.

use std::net::SocketAddr;
use std::time::Instant;

use crate::protocol::PeerId;
use crate::session::context::SessionContext;
use crate::stats::SessionStats;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Transport open, no identity registered yet
    Connected,
    /// At least one identity registered
    Registered,
    /// Transport closed; registry cleanup has run
    Closed,
}

/// Complete per-connection state
#[derive(Debug)]
pub struct SessionState {
    /// Unique session id
    pub id: u64,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// When the connection was accepted
    pub connected_at: Instant,

    /// Identities this connection has registered, in registration order
    identities: Vec<PeerId>,

    /// Per-session counters
    pub stats: SessionStats,
}

impl SessionState {
    /// Create state for a newly accepted connection
    pub fn new(id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Connected,
            connected_at: Instant::now(),
            identities: Vec::new(),
            stats: SessionStats::new(),
        }
    }

    /// Record a registration made by this connection
    ///
    /// Re-registering an identity the connection already holds is not
    /// duplicated in the list.
    pub fn on_register(&mut self, identity: PeerId) {
        if !self.identities.contains(&identity) {
            self.identities.push(identity);
        }
        self.phase = SessionPhase::Registered;
        self.stats.registrations += 1;
    }

    /// Identities registered by this connection, oldest first
    pub fn identities(&self) -> &[PeerId] {
        &self.identities
    }

    /// Whether the connection has registered at least once
    pub fn is_registered(&self) -> bool {
        self.phase == SessionPhase::Registered
    }

    /// Mark the session closed
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Time since the connection was accepted
    pub fn duration(&self) -> std::time::Duration {
        self.connected_at.elapsed()
    }

    /// Snapshot for handler callbacks
    pub fn context(&self) -> SessionContext {
        SessionContext {
            session_id: self.id,
            peer_addr: self.peer_addr,
            identities: self.identities.clone(),
            stats: self.stats.clone(),
        }
    }
}
