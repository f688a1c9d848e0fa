//! Client configuration.

/// Where and how to reach the relay server.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL (e.g., "wss://relay:8080" or "ws://localhost:8080")
    pub url: String,
    /// Allow insecure ws:// connections (for localhost development only)
    pub insecure_dev: bool,
}

impl ClientConfig {
    /// Create a configuration for `url`. Only `wss://` is accepted unless
    /// `with_insecure_dev` is applied.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            insecure_dev: false,
        }
    }

    /// Allow insecure ws:// connections (for localhost development only).
    ///
    /// # Security Warning
    ///
    /// The application key travels in every host-poll. Without TLS it is
    /// visible on the wire. Only use for local testing.
    pub fn with_insecure_dev(mut self) -> Self {
        self.insecure_dev = true;
        self
    }

    /// True if the URL scheme is allowed under this configuration.
    pub(crate) fn scheme_allowed(&self) -> bool {
        self.url.starts_with("wss://") || (self.insecure_dev && self.url.starts_with("ws://"))
    }
}
