//! Per-connection session state
//!
//! Each accepted connection gets a session: an id, a lifecycle phase, the
//! identities it has registered, and its counters. Sessions exist only for
//! the lifetime of their connection; nothing survives a disconnect.

pub mod context;
pub mod state;

pub use context::SessionContext;
pub use state::{SessionPhase, SessionState};
