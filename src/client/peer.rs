//! Relay client endpoint
//!
//! A thin typed wrapper over one WebSocket connection to the relay.
//! Connecting registers the chosen identity immediately; the relay sends
//! no acknowledgment, so a successful connect is all there is to await.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Message, Utf8Bytes};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::client::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::{PeerId, RelayNotice, SignalMessage};

/// Something the relay delivered to this client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// A signaling message from another peer
    Signal(SignalMessage),
    /// A relay-originated notice (only under the notify-sender policy)
    Notice(RelayNotice),
    /// The connection was closed
    Closed,
}

/// Client connection to a signaling relay
///
/// # Example
/// ```no_run
/// use serde_json::json;
/// use signaling_rs::client::{ClientConfig, RelayClient};
///
/// # async fn example() -> signaling_rs::error::Result<()> {
/// let config = ClientConfig::new("ws://localhost:5000");
/// let mut client = RelayClient::connect(config, "alice").await?;
///
/// client.send_offer("bob", json!({"type": "offer", "sdp": "v=0"})).await?;
/// let event = client.next_event().await?;
/// println!("received: {:?}", event);
/// # Ok(())
/// # }
/// ```
pub struct RelayClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    identity: PeerId,
}

impl RelayClient {
    /// Connect to the relay and register an identity
    pub async fn connect(config: ClientConfig, identity: impl Into<PeerId>) -> Result<Self> {
        let identity = identity.into();

        let connect = connect_async(config.url.as_str());
        let (ws, _response) = tokio::time::timeout(config.connect_timeout, connect)
            .await
            .map_err(|_| Error::HandshakeTimeout)??;

        let mut client = Self { ws, identity };
        let register = SignalMessage::Register {
            sender: client.identity.clone(),
        };
        client.send(&register).await?;

        Ok(client)
    }

    /// The identity this client registered
    pub fn identity(&self) -> &PeerId {
        &self.identity
    }

    /// Send a signaling message
    pub async fn send(&mut self, message: &SignalMessage) -> Result<()> {
        let json = message.to_json()?;
        self.ws.send(Message::Text(json.into())).await?;
        Ok(())
    }

    /// Send a session description offer to `target`
    pub async fn send_offer(&mut self, target: impl Into<PeerId>, offer: Value) -> Result<()> {
        let message = SignalMessage::Offer {
            sender: self.identity.clone(),
            target: target.into(),
            offer,
        };
        self.send(&message).await
    }

    /// Send a session description answer to `target`
    pub async fn send_answer(&mut self, target: impl Into<PeerId>, answer: Value) -> Result<()> {
        let message = SignalMessage::Answer {
            sender: self.identity.clone(),
            target: target.into(),
            answer,
        };
        self.send(&message).await
    }

    /// Send an ICE candidate to `target`
    pub async fn send_ice_candidate(
        &mut self,
        target: impl Into<PeerId>,
        candidate: Value,
    ) -> Result<()> {
        let message = SignalMessage::IceCandidate {
            sender: self.identity.clone(),
            target: target.into(),
            candidate,
        };
        self.send(&message).await
    }

    /// Send a raw text frame exactly as given
    pub async fn send_raw(&mut self, frame: impl Into<Utf8Bytes>) -> Result<()> {
        self.ws.send(Message::Text(frame.into())).await?;
        Ok(())
    }

    /// Receive the next event from the relay
    pub async fn next_event(&mut self) -> Result<ClientEvent> {
        loop {
            let Some(frame) = self.ws.next().await else {
                return Ok(ClientEvent::Closed);
            };

            match frame? {
                Message::Text(raw) => {
                    return match SignalMessage::parse(raw.as_str()) {
                        Ok(message) => Ok(ClientEvent::Signal(message)),
                        Err(signal_error) => {
                            match serde_json::from_str::<RelayNotice>(raw.as_str()) {
                                Ok(notice) => Ok(ClientEvent::Notice(notice)),
                                Err(_) => Err(Error::Json(signal_error)),
                            }
                        }
                    };
                }
                Message::Ping(payload) => {
                    self.ws.send(Message::Pong(payload)).await?;
                }
                Message::Close(_) => return Ok(ClientEvent::Closed),
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    /// Receive the next text frame verbatim
    ///
    /// Returns `None` once the connection is closed.
    pub async fn next_raw(&mut self) -> Result<Option<Utf8Bytes>> {
        loop {
            let Some(frame) = self.ws.next().await else {
                return Ok(None);
            };

            match frame? {
                Message::Text(raw) => return Ok(Some(raw)),
                Message::Ping(payload) => {
                    self.ws.send(Message::Pong(payload)).await?;
                }
                Message::Close(_) => return Ok(None),
                Message::Binary(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
    }

    /// Close the connection
    pub async fn close(&mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }
}
