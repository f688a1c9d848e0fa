//! Relay client API.
//!
//! The main public interface for hosts and clients.
//!
//! ```text
//! host:    register_host ─► host_poll (publish / answer / list asks) ─► host_poll ...
//! client:  client_poll (ask) ─► client_poll (collect + read) ─► ...
//! ```
//!
//! Every call is one request/reply exchange. Nothing waits for the other
//! party; callers poll again later.

use std::collections::BTreeMap;

use relaypost_core::{
    Action, AnswerEntry, AppKey, Entry, HostPathData, HostPaths, Request, Response, SeenRange,
    ANSWER_MARKER,
};

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::relay::RelayTransport;

/// Host-poll instructions, built per path.
///
/// Paths are sent in the order they were first mentioned.
#[derive(Debug, Clone, Default)]
pub struct HostPoll {
    paths: Vec<(String, HostPathData)>,
}

impl HostPoll {
    /// Empty poll.
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&mut self, path: &str) -> &mut HostPathData {
        let pos = match self.paths.iter().position(|(p, _)| p == path) {
            Some(pos) => pos,
            None => {
                self.paths.push((path.to_string(), HostPathData::default()));
                self.paths.len() - 1
            }
        };
        &mut self.paths[pos].1
    }

    /// List pending asks on `path`, skipping those covered by `seen`.
    pub fn watch(mut self, path: &str, seen: Vec<SeenRange>) -> Self {
        self.entry(path).indexes = Some(seen);
        self
    }

    /// Publish `text` on `path`.
    pub fn broadcast(mut self, path: &str, text: impl Into<String>) -> Self {
        self.entry(path).broadcast = Some(text.into());
        self
    }

    /// Answer ticket `idx` on `path`.
    pub fn answer(mut self, path: &str, idx: i64, text: impl Into<String>) -> Self {
        self.entry(path)
            .answer
            .get_or_insert_with(Vec::new)
            .push(AnswerEntry {
                idx,
                answer: text.into(),
            });
        self
    }

    fn into_request(self, app_id: i64, key: &AppKey) -> Request {
        Request {
            app_id: Some(app_id),
            action: Some(Action::HostPoll.code()),
            key: Some(key.as_str().to_string()),
            data: Some(self.paths.into_iter().collect::<HostPaths>()),
            ..Request::default()
        }
    }
}

/// Client-poll instructions for one path.
#[derive(Debug, Clone)]
pub struct ClientPoll {
    path: String,
    ask: Option<String>,
    tickets: Option<Vec<i64>>,
    seen: Vec<SeenRange>,
}

impl ClientPoll {
    /// Read broadcasts on `path`.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ask: None,
            tickets: None,
            seen: Vec::new(),
        }
    }

    /// Open a ticket with `text`.
    pub fn ask(mut self, text: impl Into<String>) -> Self {
        self.ask = Some(text.into());
        self
    }

    /// Collect answers for these tickets.
    pub fn collect(mut self, tickets: Vec<i64>) -> Self {
        self.tickets = Some(tickets);
        self
    }

    /// Skip broadcasts covered by `seen`.
    pub fn seen(mut self, seen: Vec<SeenRange>) -> Self {
        self.seen = seen;
        self
    }

    fn into_request(self, app_id: i64) -> Request {
        Request {
            app_id: Some(app_id),
            action: Some(Action::ClientPoll.code()),
            path: Some(self.path),
            ask: self.ask,
            tickets: self.tickets,
            indexes: Some(self.seen),
            ..Request::default()
        }
    }
}

/// Result of one client-poll.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientPollReply {
    /// Ticket created by this poll's ask.
    pub ticket: Option<i64>,
    /// Tickets whose answers were collected, in request order.
    pub answered: Vec<i64>,
    /// Collected answer texts, aligned with `answered`.
    pub answers: Vec<String>,
    /// Unseen broadcasts, ascending by serial.
    pub broadcasts: Vec<Entry>,
}

/// A connection to the relay server.
///
/// This type does not implement `Clone`; one connection, one caller.
#[derive(Debug)]
pub struct RelayClient {
    relay: RelayTransport,
}

impl RelayClient {
    /// Connect to the relay server.
    ///
    /// Rejects plain `ws://` unless the config allows insecure transport.
    pub async fn connect(config: ClientConfig) -> Result<Self, TransportError> {
        if !config.scheme_allowed() {
            return Err(TransportError::ConnectionFailed(
                "wss:// required (use insecure_dev for local testing)".into(),
            ));
        }
        let relay = RelayTransport::connect(&config.url).await?;
        Ok(Self { relay })
    }

    /// Raw exchange. The reply is returned as-is, envelope unchecked.
    pub async fn request(&mut self, request: &Request) -> Result<Response, TransportError> {
        self.relay.exchange(request).await
    }

    /// Fetch the application key, issuing it if this is the first call.
    pub async fn register_host(&mut self, app_id: i64) -> Result<AppKey, TransportError> {
        let request = Request {
            app_id: Some(app_id),
            action: Some(Action::RegisterHost.code()),
            ..Request::default()
        };
        let reply = self.checked_exchange(&request).await?;
        reply.key.map(AppKey::from_string).ok_or(TransportError::Ignored)
    }

    /// Publish, answer and list pending asks per path.
    ///
    /// Returns the pending asks keyed by path, with real ticket ids.
    /// A wrong key surfaces as `Ignored`.
    pub async fn host_poll(
        &mut self,
        app_id: i64,
        key: &AppKey,
        poll: HostPoll,
    ) -> Result<BTreeMap<String, Vec<Entry>>, TransportError> {
        let request = poll.into_request(app_id, key);
        let reply = self.checked_exchange(&request).await?;
        reply.ask.ok_or(TransportError::Ignored)
    }

    /// Ask, collect answers and read broadcasts on one path.
    pub async fn client_poll(
        &mut self,
        app_id: i64,
        poll: ClientPoll,
    ) -> Result<ClientPollReply, TransportError> {
        let request = poll.into_request(app_id);
        let reply = self.checked_exchange(&request).await?;
        let data = reply.data.ok_or(TransportError::Ignored)?;

        let (answers, broadcasts): (Vec<Entry>, Vec<Entry>) =
            data.into_iter().partition(|e| e.idx == ANSWER_MARKER);

        Ok(ClientPollReply {
            ticket: reply.ticket,
            answered: reply.answered.unwrap_or_default(),
            answers: answers.into_iter().map(|e| e.text).collect(),
            broadcasts,
        })
    }

    /// Close the connection.
    pub async fn close(mut self) {
        self.relay.close().await;
    }

    async fn checked_exchange(&mut self, request: &Request) -> Result<Response, TransportError> {
        let reply = self.relay.exchange(request).await?;
        if reply.app_id != request.app_id || reply.action != request.action {
            return Err(TransportError::UnexpectedResponse);
        }
        Ok(reply)
    }
}
