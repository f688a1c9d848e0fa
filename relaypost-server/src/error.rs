//! Server errors.
//!
//! Only startup can fail the process. A connection-level error ends that
//! connection's task and nothing else.

use std::path::PathBuf;

use thiserror::Error;
use tokio_tungstenite::tungstenite;

/// Errors raised while configuring or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Config file could not be read.
    #[error("failed to read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML or has unknown keys.
    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Websocket handshake or stream failure on one connection.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
}
