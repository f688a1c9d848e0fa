//! WebSocket relay transport.
//!
//! Internal module for WebSocket communication with the relay server.
//!
//! # Exchange Invariants
//!
//! - Strict 1:1 mapping: one request message = one reply message
//! - No pipelining: a request is not sent before the previous reply arrived
//! - Each `exchange()` = exactly one `ws.send(Text(...))` + one reply

use futures_util::{SinkExt, StreamExt};
use relaypost_core::{Request, Response};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::protocol::Message as WsMessage, MaybeTlsStream, WebSocketStream,
};
use tracing::debug;

use crate::error::TransportError;

/// Internal WebSocket relay transport.
///
/// Does not implement `Clone` to prevent socket duplication.
pub(crate) struct RelayTransport {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    url: String,
}

impl std::fmt::Debug for RelayTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayTransport").field("url", &self.url).finish()
    }
}

impl RelayTransport {
    /// Connect to the relay server.
    pub async fn connect(url: &str) -> Result<Self, TransportError> {
        let (ws, _response) = connect_async(url)
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;
        debug!(url, "connected to relay");

        Ok(Self {
            ws,
            url: url.to_string(),
        })
    }

    /// Send one request and wait for its reply.
    pub async fn exchange(&mut self, request: &Request) -> Result<Response, TransportError> {
        self.ws
            .send(WsMessage::Text(request.encode()))
            .await
            .map_err(|e| TransportError::WebSocket(e.to_string()))?;

        let raw = self.recv_raw().await?;
        Ok(Response::decode(&raw)?)
    }

    /// Receive the next text (or UTF-8 binary) message.
    async fn recv_raw(&mut self) -> Result<String, TransportError> {
        loop {
            match self.ws.next().await {
                Some(Ok(WsMessage::Text(text))) => return Ok(text),
                Some(Ok(WsMessage::Binary(data))) => {
                    return String::from_utf8(data).map_err(|e| TransportError::Decode(e.to_string()))
                }
                Some(Ok(WsMessage::Close(_))) => return Err(TransportError::PeerDisconnected),
                Some(Ok(_)) => continue, // Ignore Ping, Pong
                Some(Err(e)) => return Err(TransportError::WebSocket(e.to_string())),
                None => return Err(TransportError::PeerDisconnected),
            }
        }
    }

    /// Close the connection. Best effort.
    pub async fn close(&mut self) {
        let _ = self.ws.close(None).await;
    }
}
