//! Per-connection transport handling
//!
//! Each accepted connection is split into a reader loop (this task) and a
//! writer task fed by an unbounded channel. The registry and other
//! connections only ever hold the channel's sender wrapped in a
//! `ConnectionHandle`, so forwarding to this connection never blocks the
//! forwarder.

use std::sync::Arc;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::registry::{ConnectionHandle, PeerRegistry};
use crate::router::Router;
use crate::server::handler::RelayHandler;
use crate::session::SessionState;
use crate::stats::RelayStats;

/// State and collaborators for a single accepted connection
pub(crate) struct Connection<H: RelayHandler> {
    state: SessionState,
    router: Router<H>,
    handler: Arc<H>,
    registry: Arc<PeerRegistry>,
    stats: Arc<RelayStats>,
}

impl<H: RelayHandler> Connection<H> {
    pub(crate) fn new(
        state: SessionState,
        router: Router<H>,
        handler: Arc<H>,
        registry: Arc<PeerRegistry>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            state,
            router,
            handler,
            registry,
            stats,
        }
    }

    /// Drive the connection until its transport closes
    pub(crate) async fn run(mut self, ws: WebSocketStream<TcpStream>) -> Result<()> {
        let (sink, mut stream) = ws.split();
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(write_loop(self.state.id, sink, rx));

        let handle = ConnectionHandle::new(self.state.id, tx);
        self.stats.connection_opened();

        if !self.handler.on_connection(&self.state.context()).await {
            tracing::info!(
                session_id = self.state.id,
                peer = %self.state.peer_addr,
                "Connection refused by handler"
            );
            handle.send(Message::Close(None));
            self.finish(&handle).await;
            return Ok(());
        }

        while let Some(frame) = stream.next().await {
            match frame {
                Ok(Message::Text(raw)) => {
                    self.router.handle_frame(&mut self.state, &handle, raw).await;
                }
                Ok(Message::Binary(payload)) => {
                    // The protocol is JSON text frames only
                    tracing::trace!(
                        session_id = self.state.id,
                        len = payload.len(),
                        "Ignoring binary frame"
                    );
                }
                Ok(Message::Ping(payload)) => {
                    handle.send(Message::Pong(payload));
                }
                Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Ok(Message::Close(_)) => break,
                Err(error) => {
                    tracing::debug!(
                        session_id = self.state.id,
                        error = %error,
                        "Transport error, closing"
                    );
                    break;
                }
            }
        }

        self.finish(&handle).await;
        Ok(())
    }

    /// Lifecycle close: registry cleanup exactly once, then notify the
    /// handler. Peers are NOT informed; they learn of the disconnect from
    /// their own transport events.
    async fn finish(&mut self, handle: &ConnectionHandle) {
        let removed = self.registry.remove_all_for(handle).await;
        self.state.close();
        self.stats.connection_closed();

        tracing::debug!(
            session_id = self.state.id,
            identities_removed = removed.len(),
            forwarded = self.state.stats.messages_forwarded,
            dropped = self.state.stats.dropped(),
            "Session closed"
        );

        self.handler.on_disconnect(&self.state.context()).await;
    }
}

/// Writer task: drains the outbound channel into the WebSocket sink.
///
/// Ends when every sender clone is gone (registry cleanup has run and the
/// reader loop dropped its handle) or when the sink errors.
async fn write_loop(
    session_id: u64,
    mut sink: SplitSink<WebSocketStream<TcpStream>, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        let is_close = matches!(message, Message::Close(_));
        if let Err(error) = sink.send(message).await {
            tracing::trace!(session_id = session_id, error = %error, "Write failed");
            break;
        }
        if is_close {
            break;
        }
    }
    let _ = sink.close().await;
}
