//! Two clients negotiating through a local relay
//!
//! Run with: cargo run --example loopback_call
//!
//! Starts a relay on an ephemeral port, connects two clients, and walks
//! through a full negotiation: offer, answer, then trickled ICE
//! candidates. The payloads here are placeholders; real peers would carry
//! SDP and candidate objects produced by a WebRTC stack.

use std::sync::Arc;

use serde_json::json;
use tokio::net::TcpListener;

use signaling_rs::{ClientConfig, ClientEvent, DefaultRelayHandler, RelayClient, RelayServer, ServerConfig, SignalMessage};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Bind to port 0 so the demo never collides with a running relay
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = Arc::new(RelayServer::new(
        ServerConfig::with_addr(addr),
        DefaultRelayHandler,
    ));
    let server_task = Arc::clone(&server);
    tokio::spawn(async move {
        if let Err(e) = server_task.run_on(listener).await {
            eprintln!("relay error: {}", e);
        }
    });

    let url = format!("ws://{}", addr);
    println!("Relay listening on {}", url);

    let mut alice = RelayClient::connect(ClientConfig::new(url.clone()), "alice").await?;
    let mut bob = RelayClient::connect(ClientConfig::new(url), "bob").await?;

    // Registration is fire-and-forget; wait for the relay to apply both
    while server.registry().len().await < 2 {
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    println!("alice and bob registered");

    // Caller side: offer
    alice
        .send_offer("bob", json!({"type": "offer", "sdp": "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\n"}))
        .await?;

    match bob.next_event().await? {
        ClientEvent::Signal(SignalMessage::Offer { sender, .. }) => {
            println!("bob received offer from {}", sender);
        }
        other => panic!("expected offer, got {:?}", other),
    }

    // Callee side: answer
    bob.send_answer("alice", json!({"type": "answer", "sdp": "v=0\r\n"}))
        .await?;

    match alice.next_event().await? {
        ClientEvent::Signal(SignalMessage::Answer { sender, .. }) => {
            println!("alice received answer from {}", sender);
        }
        other => panic!("expected answer, got {:?}", other),
    }

    // Trickle a few candidates
    for index in 0..3 {
        alice
            .send_ice_candidate(
                "bob",
                json!({
                    "candidate": format!("candidate:{} 1 UDP 2130706431 192.0.2.1 {} typ host", index, 50000 + index),
                    "sdpMLineIndex": 0,
                }),
            )
            .await?;
    }

    for _ in 0..3 {
        match bob.next_event().await? {
            ClientEvent::Signal(SignalMessage::IceCandidate { candidate, .. }) => {
                println!("bob received candidate: {}", candidate["candidate"]);
            }
            other => panic!("expected ice-candidate, got {:?}", other),
        }
    }

    alice.close().await?;
    bob.close().await?;
    println!("negotiation relayed successfully");

    Ok(())
}
