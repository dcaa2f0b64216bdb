//! Statistics for relay sessions and the server as a whole

pub mod metrics;

pub use metrics::{RelayStats, ServerStats, SessionStats};
