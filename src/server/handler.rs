//! Relay handler trait
//!
//! The handler is the seam between the relay core and application policy:
//! admission control, registration vetting, and what to do when a message
//! cannot be delivered. Every method has a default, so a handler only
//! overrides what it cares about; `DefaultRelayHandler` preserves the
//! baseline protocol exactly (accept everything, drop silently).

use std::future::Future;

use crate::protocol::{PeerId, SignalMessage};
use crate::session::SessionContext;

/// What to do with a message whose target cannot be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropAction {
    /// Drop with no observable side effect (the baseline contract)
    #[default]
    Ignore,
    /// Drop, then send a `delivery-failure` notice back to the sender
    NotifySender,
}

/// Callbacks invoked by the relay for connection and routing events
///
/// Async callbacks run inline in the owning connection's task; keep them
/// short so one connection cannot stall its own message processing.
pub trait RelayHandler: Send + Sync + 'static {
    /// Called when a connection completes the WebSocket handshake.
    ///
    /// Return `false` to reject the connection; it is closed before any
    /// message is processed.
    fn on_connection(&self, ctx: &SessionContext) -> impl Future<Output = bool> + Send {
        let _ = ctx;
        async { true }
    }

    /// Called before a `register` message mutates the registry.
    ///
    /// Return `false` to refuse the registration. The frame is dropped and
    /// nothing is sent back, matching the protocol's no-ack contract.
    fn on_register(
        &self,
        ctx: &SessionContext,
        identity: &PeerId,
    ) -> impl Future<Output = bool> + Send {
        let _ = (ctx, identity);
        async { true }
    }

    /// Called after a message has been queued to its target.
    fn on_forward(
        &self,
        ctx: &SessionContext,
        message: &SignalMessage,
    ) -> impl Future<Output = ()> + Send {
        let _ = (ctx, message);
        async {}
    }

    /// Called when the connection's transport has closed and registry
    /// cleanup has run.
    fn on_disconnect(&self, ctx: &SessionContext) -> impl Future<Output = ()> + Send {
        let _ = ctx;
        async {}
    }

    /// Policy applied when a message names an unresolvable target.
    ///
    /// The default keeps the unknown-target drop silent.
    fn unknown_target_action(&self) -> DropAction {
        DropAction::Ignore
    }

    /// Called after a message was dropped (unknown target or target whose
    /// connection already went away).
    fn on_drop(&self, ctx: &SessionContext, message: &SignalMessage) {
        let _ = (ctx, message);
    }

    /// Called when a frame fails to parse. The frame is dropped and the
    /// connection stays open.
    fn on_malformed(&self, ctx: &SessionContext, error: &serde_json::Error) {
        let _ = (ctx, error);
    }
}

/// Handler implementing the baseline contract: accept every connection and
/// registration, drop undeliverable messages silently
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRelayHandler;

impl RelayHandler for DefaultRelayHandler {}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr, SocketAddr};

    use super::*;
    use crate::session::SessionState;

    fn ctx() -> SessionContext {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 5000);
        SessionState::new(1, addr).context()
    }

    #[test]
    fn test_default_handler_accepts_everything() {
        let handler = DefaultRelayHandler;
        let ctx = ctx();

        tokio_test::block_on(async {
            assert!(handler.on_connection(&ctx).await);
            assert!(handler.on_register(&ctx, &PeerId::from("alice")).await);
        });
        assert_eq!(handler.unknown_target_action(), DropAction::Ignore);
    }

    #[test]
    fn test_drop_action_default_is_ignore() {
        assert_eq!(DropAction::default(), DropAction::Ignore);
    }
}
