//! Standalone signaling relay example
//!
//! Run with: cargo run --example relay_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example relay_server                    # binds to 0.0.0.0:5000
//!   cargo run --example relay_server localhost          # binds to 127.0.0.1:5000
//!   cargo run --example relay_server 127.0.0.1:5001     # binds to 127.0.0.1:5001
//!
//! Point two browser peers (or two `loopback_call` clients) at the
//! printed address. Each peer sends `{"type":"register","sender":"<id>"}`
//! first, then exchanges offer/answer/ice-candidate frames addressed by
//! `target`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use signaling_rs::session::SessionContext;
use signaling_rs::{PeerId, RelayHandler, RelayServer, ServerConfig, SignalMessage};

/// Handler that logs events and counts relay activity
struct CountingHandler {
    registrations: AtomicU64,
    forwarded: AtomicU64,
    dropped: AtomicU64,
}

impl CountingHandler {
    fn new() -> Self {
        Self {
            registrations: AtomicU64::new(0),
            forwarded: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn print_totals(&self) {
        println!(
            "Totals: registrations={} forwarded={} dropped={}",
            self.registrations.load(Ordering::Relaxed),
            self.forwarded.load(Ordering::Relaxed),
            self.dropped.load(Ordering::Relaxed),
        );
    }
}

impl RelayHandler for CountingHandler {
    async fn on_connection(&self, ctx: &SessionContext) -> bool {
        println!("[{}] New connection from {}", ctx.session_id, ctx.peer_addr);
        true
    }

    async fn on_register(&self, ctx: &SessionContext, identity: &PeerId) -> bool {
        self.registrations.fetch_add(1, Ordering::Relaxed);
        println!("[{}] Registered '{}'", ctx.session_id, identity);
        true
    }

    async fn on_forward(&self, _ctx: &SessionContext, message: &SignalMessage) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            kind = %message.kind(),
            sender = %message.sender(),
            "Relayed message"
        );
    }

    fn on_drop(&self, ctx: &SessionContext, message: &SignalMessage) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
        println!(
            "[{}] Dropped {} for unknown target '{}'",
            ctx.session_id,
            message.kind(),
            message.target().map(PeerId::as_str).unwrap_or_default(),
        );
    }

    async fn on_disconnect(&self, ctx: &SessionContext) {
        println!(
            "[{}] Disconnected (identities: {:?}, received: {}, forwarded: {})",
            ctx.session_id,
            ctx.identities.iter().map(PeerId::as_str).collect::<Vec<_>>(),
            ctx.stats.messages_received,
            ctx.stats.messages_forwarded,
        );
        self.print_totals();
    }
}

/// Parse bind address from a command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:5000
/// - "localhost:5001" -> 127.0.0.1:5001
/// - "127.0.0.1" -> 127.0.0.1:5000
/// - "0.0.0.0:5001" -> 0.0.0.0:5001
fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    const DEFAULT_PORT: u16 = signaling_rs::server::DEFAULT_PORT;

    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: relay_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:5000)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  relay_server                     # binds to 0.0.0.0:5000");
    eprintln!("  relay_server localhost           # binds to 127.0.0.1:5000");
    eprintln!("  relay_server 127.0.0.1:5001      # binds to 127.0.0.1:5001");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let bind_addr = match args.get(1) {
        Some(addr_str) => match parse_bind_addr(addr_str) {
            Ok(addr) => addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        },
        None => ServerConfig::default().bind_addr,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("signaling_rs=debug".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let config = ServerConfig::default().bind(bind_addr);

    println!("Starting signaling relay on {}", config.bind_addr);
    println!();
    println!("Connect with: ws://{}", config.bind_addr);
    println!("Register:     {{\"type\":\"register\",\"sender\":\"alice\"}}");
    println!("Then signal:  {{\"type\":\"offer\",\"sender\":\"alice\",\"target\":\"bob\",\"offer\":{{...}}}}");
    println!();

    let server = RelayServer::new(config, CountingHandler::new());

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            println!("\nShutting down...");
        })
        .await?;

    Ok(())
}
