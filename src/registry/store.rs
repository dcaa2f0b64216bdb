//! Peer registry implementation
//!
//! The central identity-to-connection map consulted before every forward
//! and mutated on registration and disconnect.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::entry::{ConnectionHandle, PeerEntry};
use crate::protocol::PeerId;

/// Registry of registered peer identities
///
/// Thread-safe via `RwLock`: resolves take the read lock, registration and
/// cleanup take the write lock. The lock is held only for the map
/// operation itself, never across an await on I/O.
pub struct PeerRegistry {
    /// Map of identity to registration entry
    peers: RwLock<HashMap<PeerId, PeerEntry>>,
}

impl PeerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Register an identity for a connection
    ///
    /// Unconditional insert-or-overwrite: last registration wins and no
    /// uniqueness check is made across connections. The identity is not
    /// validated; the empty string is accepted.
    ///
    /// Returns the displaced entry, if any. When the displaced entry
    /// belongs to a different, still-open connection, that connection is
    /// left open but unroutable until it closes on its own.
    pub async fn register(
        &self,
        identity: PeerId,
        handle: ConnectionHandle,
    ) -> Option<PeerEntry> {
        let session_id = handle.session_id();
        let displaced = {
            let mut peers = self.peers.write().await;
            peers.insert(identity.clone(), PeerEntry::new(handle))
        };

        match &displaced {
            Some(prev) if prev.handle.session_id() != session_id => {
                tracing::info!(
                    identity = %identity,
                    session_id = session_id,
                    previous_session_id = prev.handle.session_id(),
                    "Identity re-registered from a new connection"
                );
            }
            Some(_) => {
                tracing::debug!(
                    identity = %identity,
                    session_id = session_id,
                    "Identity re-registered on the same connection"
                );
            }
            None => {
                tracing::info!(
                    identity = %identity,
                    session_id = session_id,
                    "Peer registered"
                );
            }
        }

        displaced
    }

    /// Look up the connection currently bound to an identity
    ///
    /// Not-found is not an error: the caller simply skips forwarding.
    pub async fn resolve(&self, identity: &PeerId) -> Option<ConnectionHandle> {
        let peers = self.peers.read().await;
        peers.get(identity).map(|entry| entry.handle.clone())
    }

    /// Remove every entry bound to the given connection
    ///
    /// Invoked on transport close. Matching is by connection equality, not
    /// by the identities the connection believes it registered, which
    /// covers both multi-identity connections and identities that were
    /// re-registered elsewhere in the meantime.
    ///
    /// Returns the identities that were removed.
    pub async fn remove_all_for(&self, handle: &ConnectionHandle) -> Vec<PeerId> {
        let mut removed = Vec::new();
        {
            let mut peers = self.peers.write().await;
            peers.retain(|identity, entry| {
                if entry.handle == *handle {
                    removed.push(identity.clone());
                    false
                } else {
                    true
                }
            });
        }

        if !removed.is_empty() {
            tracing::info!(
                session_id = handle.session_id(),
                identities = ?removed,
                "Registry entries removed on disconnect"
            );
        }

        removed
    }

    /// Whether an identity is currently registered
    pub async fn contains(&self, identity: &PeerId) -> bool {
        self.peers.read().await.contains_key(identity)
    }

    /// Number of registered identities
    pub async fn len(&self) -> usize {
        self.peers.read().await.len()
    }

    /// Whether the registry has no entries
    pub async fn is_empty(&self) -> bool {
        self.peers.read().await.is_empty()
    }

    /// Snapshot of all registered identities
    pub async fn identities(&self) -> Vec<PeerId> {
        self.peers.read().await.keys().cloned().collect()
    }
}

impl Default for PeerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::mpsc;
    use tokio_tungstenite::tungstenite::Message;

    use super::*;

    fn handle(session_id: u64) -> (ConnectionHandle, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ConnectionHandle::new(session_id, tx), rx)
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = PeerRegistry::new();
        let (c1, _rx) = handle(1);

        registry.register(PeerId::from("alice"), c1).await;

        let resolved = registry.resolve(&PeerId::from("alice")).await.unwrap();
        assert_eq!(resolved.session_id(), 1);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_returns_none() {
        let registry = PeerRegistry::new();
        assert!(registry.resolve(&PeerId::from("ghost")).await.is_none());
    }

    #[tokio::test]
    async fn test_last_registration_wins() {
        let registry = PeerRegistry::new();
        let (c1, _rx1) = handle(1);
        let (c2, _rx2) = handle(2);

        registry.register(PeerId::from("alice"), c1).await;
        let displaced = registry.register(PeerId::from("alice"), c2).await;

        assert_eq!(displaced.unwrap().handle.session_id(), 1);
        let resolved = registry.resolve(&PeerId::from("alice")).await.unwrap();
        assert_eq!(resolved.session_id(), 2);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_identity_accepted() {
        let registry = PeerRegistry::new();
        let (c1, _rx) = handle(1);

        registry.register(PeerId::from(""), c1).await;

        assert!(registry.contains(&PeerId::from("")).await);
    }

    #[tokio::test]
    async fn test_remove_all_for_removes_only_matching() {
        let registry = PeerRegistry::new();
        let (c1, _rx1) = handle(1);
        let (c2, _rx2) = handle(2);

        // One connection registers twice, another once
        registry.register(PeerId::from("alice"), c1.clone()).await;
        registry.register(PeerId::from("alice-backup"), c1.clone()).await;
        registry.register(PeerId::from("bob"), c2).await;

        let mut removed = registry.remove_all_for(&c1).await;
        removed.sort_by(|a, b| a.as_str().cmp(b.as_str()));

        assert_eq!(removed, vec![PeerId::from("alice"), PeerId::from("alice-backup")]);
        assert!(registry.resolve(&PeerId::from("alice")).await.is_none());
        assert!(registry.resolve(&PeerId::from("alice-backup")).await.is_none());
        assert!(registry.resolve(&PeerId::from("bob")).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_all_for_skips_rebound_identity() {
        let registry = PeerRegistry::new();
        let (c1, _rx1) = handle(1);
        let (c2, _rx2) = handle(2);

        // c1 registers "alice", then c2 takes the identity over
        registry.register(PeerId::from("alice"), c1.clone()).await;
        registry.register(PeerId::from("alice"), c2).await;

        // c1 closing must not evict c2's binding
        let removed = registry.remove_all_for(&c1).await;

        assert!(removed.is_empty());
        let resolved = registry.resolve(&PeerId::from("alice")).await.unwrap();
        assert_eq!(resolved.session_id(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registrations_are_not_lost() {
        let registry = Arc::new(PeerRegistry::new());
        let mut tasks = Vec::new();

        for i in 0..32u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let (c, rx) = {
                    let (tx, rx) = mpsc::unbounded_channel();
                    (ConnectionHandle::new(i, tx), rx)
                };
                registry.register(PeerId::from(format!("peer-{}", i)), c).await;
                // Keep the receiver alive until registration is visible
                rx
            }));
        }

        let mut receivers = Vec::new();
        for task in tasks {
            receivers.push(task.await.unwrap());
        }

        assert_eq!(registry.len().await, 32);
        for i in 0..32u64 {
            let resolved = registry
                .resolve(&PeerId::from(format!("peer-{}", i)))
                .await
                .unwrap();
            assert_eq!(resolved.session_id(), i);
        }
    }
}
