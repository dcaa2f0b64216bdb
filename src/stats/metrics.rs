//! Statistics and metrics for signaling sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Per-session counters
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Text frames received on this connection
    pub messages_received: u64,
    /// Messages successfully queued to a resolved target
    pub messages_forwarded: u64,
    /// Messages dropped because the target was not resolvable
    pub dropped_unknown_target: u64,
    /// Frames dropped because they failed to parse
    pub dropped_malformed: u64,
    /// Registrations performed by this connection
    pub registrations: u64,
    /// Bytes received in text frames
    pub bytes_received: u64,
    /// Bytes forwarded to targets
    pub bytes_forwarded: u64,
}

impl SessionStats {
    /// Create a zeroed counter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Total messages dropped for any reason
    pub fn dropped(&self) -> u64 {
        self.dropped_unknown_target + self.dropped_malformed
    }
}

/// Server-wide counters, updated from every connection task
#[derive(Debug)]
pub struct RelayStats {
    total_connections: AtomicU64,
    active_connections: AtomicU64,
    messages_forwarded: AtomicU64,
    messages_dropped: AtomicU64,
    registrations: AtomicU64,
    started_at: Instant,
}

impl RelayStats {
    /// Create a counter set anchored at the current instant
    pub fn new() -> Self {
        Self {
            total_connections: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            messages_forwarded: AtomicU64::new(0),
            messages_dropped: AtomicU64::new(0),
            registrations: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }

    /// Record a connection entering service
    pub fn connection_opened(&self) {
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a connection leaving service
    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record a successful forward
    pub fn record_forward(&self) {
        self.messages_forwarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a dropped message (unknown target or malformed frame)
    pub fn record_drop(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a registration
    pub fn record_registration(&self) {
        self.registrations.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot
    ///
    /// `registered_peers` is not known here; the server fills it in from
    /// the registry.
    pub fn snapshot(&self) -> ServerStats {
        ServerStats {
            total_connections: self.total_connections.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            messages_forwarded: self.messages_forwarded.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            registrations: self.registrations.load(Ordering::Relaxed),
            registered_peers: 0,
            uptime: self.started_at.elapsed(),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of server-wide statistics
#[derive(Debug, Clone)]
pub struct ServerStats {
    /// Connections accepted since startup
    pub total_connections: u64,
    /// Connections currently in service
    pub active_connections: u64,
    /// Messages forwarded since startup
    pub messages_forwarded: u64,
    /// Messages dropped since startup
    pub messages_dropped: u64,
    /// Registrations since startup
    pub registrations: u64,
    /// Identities currently registered
    pub registered_peers: u64,
    /// Time since the counters were created
    pub uptime: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.messages_received, 0);
        assert_eq!(stats.messages_forwarded, 0);
        assert_eq!(stats.dropped_unknown_target, 0);
        assert_eq!(stats.dropped_malformed, 0);
        assert_eq!(stats.registrations, 0);
        assert_eq!(stats.dropped(), 0);
    }

    #[test]
    fn test_session_stats_dropped_total() {
        let stats = SessionStats {
            dropped_unknown_target: 3,
            dropped_malformed: 2,
            ..SessionStats::new()
        };
        assert_eq!(stats.dropped(), 5);
    }

    #[test]
    fn test_relay_stats_counters() {
        let stats = RelayStats::new();

        stats.connection_opened();
        stats.connection_opened();
        stats.connection_closed();
        stats.record_forward();
        stats.record_drop();
        stats.record_registration();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.total_connections, 2);
        assert_eq!(snapshot.active_connections, 1);
        assert_eq!(snapshot.messages_forwarded, 1);
        assert_eq!(snapshot.messages_dropped, 1);
        assert_eq!(snapshot.registrations, 1);
        assert_eq!(snapshot.registered_peers, 0);
    }
}
