//! relaypost WebSocket server.
//!
//! Accepts connections, runs one task per connection and hands every
//! inbound message to the shared [`Relay`]. Strictly request/response:
//! exactly one reply per inbound message, nothing is ever pushed.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use relaypost_core::Relay;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::protocol::Message;
use tracing::{debug, info, warn};

pub mod config;
pub mod error;

pub use config::ServerConfig;
pub use error::ServerError;

type IpConnMap = Arc<DashMap<IpAddr, usize>>;

/// Accept connections until the listener fails.
///
/// Connections beyond `max_conn_per_ip` from the same address are dropped
/// right after accept.
pub async fn run_server(listener: TcpListener, relay: Arc<Relay>, max_conn_per_ip: usize) {
    let ip_conns: IpConnMap = Arc::new(DashMap::new());

    if let Ok(addr) = listener.local_addr() {
        info!(%addr, max_apps = relay.config().max_apps, "relay listening");
    }

    loop {
        let (stream, peer) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed, stopping");
                return;
            }
        };

        let ip = peer.ip();
        {
            let mut current = ip_conns.entry(ip).or_insert(0);
            if *current >= max_conn_per_ip {
                warn!(%ip, limit = max_conn_per_ip, "connection limit reached, dropping");
                continue;
            }
            *current += 1;
        }

        let relay = Arc::clone(&relay);
        let ip_conns = Arc::clone(&ip_conns);
        tokio::spawn(async move {
            match handle_connection(stream, relay, peer).await {
                Ok(()) => info!(%peer, "connection closed"),
                Err(e) => debug!(%peer, error = %e, "connection ended with error"),
            }
            if let Some(mut count) = ip_conns.get_mut(&ip) {
                *count = count.saturating_sub(1);
            }
            ip_conns.remove_if(&ip, |_, count| *count == 0);
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    relay: Arc<Relay>,
    peer: SocketAddr,
) -> Result<(), ServerError> {
    let callback = |req: &Request, response: Response| -> Result<Response, ErrorResponse> {
        debug!(%peer, path = req.uri().path(), "websocket upgrade");
        Ok(response)
    };

    let ws_stream = match accept_hdr_async(stream, callback).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(%peer, error = %e, "websocket handshake failed");
            return Err(e.into());
        }
    };
    info!(%peer, "connection established");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    while let Some(msg) = ws_rx.next().await {
        let reply = match msg? {
            Message::Text(text) => relay.handle_text(&text),
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => relay.handle_text(text),
                Err(_) => {
                    debug!(%peer, "dropping non utf-8 binary request");
                    relaypost_core::Response::default()
                }
            },
            Message::Close(_) => break,
            // Ping/Pong are answered by the websocket layer.
            _ => continue,
        };
        ws_tx.send(Message::Text(reply.encode())).await?;
    }

    Ok(())
}
