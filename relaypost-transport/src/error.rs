//! Transport errors.

use thiserror::Error;

/// Errors that can occur while talking to the relay server.
///
/// The server never reports failures explicitly. A request it ignored comes
/// back as a bare envelope, which surfaces here as `Ignored`.
#[derive(Debug, Error)]
pub enum TransportError {
    // --- Connection & Setup ---
    /// Failed to establish WebSocket connection.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    // --- Exchange ---
    /// WebSocket error.
    #[error("websocket error: {0}")]
    WebSocket(String),
    /// Reply was not a valid reply object.
    #[error("undecodable reply: {0}")]
    Decode(String),
    /// Reply envelope does not echo the request's app id and action.
    #[error("unexpected reply envelope")]
    UnexpectedResponse,
    /// Server echoed the envelope but did nothing: out-of-range id, wrong
    /// key, or a missing required field.
    #[error("request ignored by server")]
    Ignored,

    // --- Lifecycle ---
    /// Server closed the connection.
    #[error("peer disconnected")]
    PeerDisconnected,
}

impl From<relaypost_core::RelayError> for TransportError {
    fn from(e: relaypost_core::RelayError) -> Self {
        Self::Decode(e.to_string())
    }
}
