//! Client configuration

use std::time::Duration;

/// Client configuration options
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay URL, e.g. `ws://localhost:5000`
    pub url: String,

    /// Connect and handshake must complete within this time
    pub connect_timeout: Duration,
}

impl ClientConfig {
    /// Create a new config for the given relay URL
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}
