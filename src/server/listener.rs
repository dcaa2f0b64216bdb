//! Relay server listener
//!
//! Handles the TCP accept loop, the WebSocket handshake, and spawning one
//! task per connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio_tungstenite::accept_async;

use crate::error::Result;
use crate::registry::PeerRegistry;
use crate::router::Router;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::handler::RelayHandler;
use crate::session::SessionState;
use crate::stats::{RelayStats, ServerStats};

/// WebSocket signaling relay server
pub struct RelayServer<H: RelayHandler> {
    config: ServerConfig,
    handler: Arc<H>,
    registry: Arc<PeerRegistry>,
    stats: Arc<RelayStats>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<H: RelayHandler> RelayServer<H> {
    /// Create a new server with the given configuration and handler
    pub fn new(config: ServerConfig, handler: H) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            handler: Arc::new(handler),
            registry: Arc::new(PeerRegistry::new()),
            stats: Arc::new(RelayStats::new()),
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// The registry backing this server
    pub fn registry(&self) -> &Arc<PeerRegistry> {
        &self.registry
    }

    /// Point-in-time server statistics
    pub async fn stats(&self) -> ServerStats {
        let mut snapshot = self.stats.snapshot();
        snapshot.registered_peers = self.registry.len().await as u64;
        snapshot
    }

    /// The configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Run the server
    ///
    /// Binds to the configured address and blocks until shut down.
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling relay listening");
        self.accept_loop(&listener).await
    }

    /// Run the server on a pre-bound listener
    ///
    /// Useful when the caller needs the actual bound address, e.g. after
    /// binding to port 0.
    pub async fn run_on(&self, listener: TcpListener) -> Result<()> {
        if let Ok(addr) = listener.local_addr() {
            tracing::info!(addr = %addr, "Signaling relay listening");
        }
        self.accept_loop(&listener).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: std::future::Future<Output = ()>,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %self.config.bind_addr, "Signaling relay listening");

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        }
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(error) => {
                    tracing::error!(error = %error, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit; the permit moves into the connection
        // task so the slot is held for the connection's whole lifetime
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(session_id = session_id, peer = %peer_addr, "New connection");

        if self.config.tcp_nodelay {
            if let Err(error) = socket.set_nodelay(true) {
                tracing::debug!(session_id = session_id, error = %error, "Failed to set TCP_NODELAY");
            }
        }

        let handshake_timeout = self.config.handshake_timeout;
        let router = Router::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.handler),
            Arc::clone(&self.stats),
        );
        let handler = Arc::clone(&self.handler);
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        tokio::spawn(async move {
            let _permit = permit;

            let ws = match tokio::time::timeout(handshake_timeout, accept_async(socket)).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(error)) => {
                    tracing::debug!(
                        session_id = session_id,
                        error = %error,
                        "WebSocket handshake failed"
                    );
                    return;
                }
                Err(_) => {
                    tracing::debug!(session_id = session_id, "WebSocket handshake timed out");
                    return;
                }
            };

            let state = SessionState::new(session_id, peer_addr);
            let connection = Connection::new(state, router, handler, registry, stats);

            if let Err(error) = connection.run(ws).await {
                tracing::debug!(session_id = session_id, error = %error, "Connection error");
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }
}
