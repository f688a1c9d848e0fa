//! Relay dispatcher.
//!
//! One call per inbound message, one reply out:
//!
//! ```text
//! decode ─► envelope (app_id, action) ─► range check ─► action
//!   │            │                          │             ├─ register-host: key
//!   ▼            ▼                          ▼             ├─ host-poll:  key check, publish, answer, pending asks
//!  {}           {}                    echo only           └─ client-poll: ask, collect, unseen broadcasts
//! ```
//!
//! Nothing here is fatal. A rejected request still gets its envelope back,
//! and a missing optional field only skips the step it drives.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::RelayError;
use crate::message::{Action, Request, Response};
use crate::registry::Registry;
use crate::state::RelayState;

/// Default upper bound (exclusive) for application ids.
pub const DEFAULT_MAX_APPS: i64 = 250;

/// Configuration consumed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Application ids must satisfy `0 <= id < max_apps`.
    pub max_apps: i64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_apps: DEFAULT_MAX_APPS,
        }
    }
}

impl RelayConfig {
    /// Set the application id bound.
    pub fn with_max_apps(mut self, max_apps: i64) -> Self {
        self.max_apps = max_apps;
        self
    }

    /// True if `app_id` is within the configured range.
    pub fn accepts(&self, app_id: i64) -> bool {
        (0..self.max_apps).contains(&app_id)
    }
}

/// The relay: registry plus channel state behind one dispatch entry point.
///
/// Shared across connection tasks behind an `Arc`.
#[derive(Debug, Default)]
pub struct Relay {
    config: RelayConfig,
    registry: Registry,
    state: RelayState,
}

impl Relay {
    /// Create an empty relay.
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            registry: Registry::new(),
            state: RelayState::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> RelayConfig {
        self.config
    }

    /// Issued application keys.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Channel state for every application.
    pub fn state(&self) -> &RelayState {
        &self.state
    }

    /// Decode and handle one raw message. Malformed input yields `{}`.
    pub fn handle_text(&self, raw: &str) -> Response {
        match Request::decode(raw) {
            Ok(request) => self.handle_message(request),
            Err(e) => {
                debug!(kind = e.kind(), error = %e, "dropping request");
                Response::default()
            }
        }
    }

    /// Handle one decoded request.
    pub fn handle_message(&self, request: Request) -> Response {
        let (app_id, action) = match request.envelope() {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(kind = e.kind(), error = %e, "dropping request");
                return Response::default();
            }
        };

        let mut reply = Response::echo(app_id, action);
        if let Err(e) = self.dispatch(app_id, action, request, &mut reply) {
            debug!(app_id, action, kind = e.kind(), "request ignored");
        }
        reply
    }

    fn dispatch(
        &self,
        app_id: i64,
        action: i64,
        request: Request,
        reply: &mut Response,
    ) -> Result<(), RelayError> {
        if !self.config.accepts(app_id) {
            return Err(RelayError::UnknownApplication(app_id));
        }
        let action = Action::from_code(action).ok_or(RelayError::UnknownAction(action))?;
        debug!(app_id, ?action, "dispatching");

        match action {
            Action::RegisterHost => {
                reply.key = Some(self.registry.register_or_get_key(app_id));
                Ok(())
            }
            Action::HostPoll => self.host_poll(app_id, request, reply),
            Action::ClientPoll => self.client_poll(app_id, request, reply),
        }
    }

    fn host_poll(&self, app_id: i64, request: Request, reply: &mut Response) -> Result<(), RelayError> {
        let key = request.key.ok_or(RelayError::MissingField("key"))?;
        if !self.registry.check_key(app_id, &key) {
            return Err(RelayError::Unauthorized);
        }
        let data = request.data.ok_or(RelayError::MissingField("data"))?;

        let pending = self.state.with_app(app_id, |app| {
            let mut pending = BTreeMap::new();
            for (path, instructions) in data {
                let ranges = instructions.indexes.unwrap_or_default();
                if let Some(text) = instructions.broadcast {
                    app.publish(&path, text);
                }
                for entry in instructions.answer.unwrap_or_default() {
                    app.answer(&path, entry.idx, entry.answer);
                }
                let asks = app.pending_asks(&path, &ranges);
                pending.insert(path, asks);
            }
            pending
        });

        reply.ask = Some(pending);
        Ok(())
    }

    fn client_poll(&self, app_id: i64, request: Request, reply: &mut Response) -> Result<(), RelayError> {
        let path = request.path.ok_or(RelayError::MissingField("path"))?;
        let ranges = request.indexes.unwrap_or_default();

        self.state.with_app(app_id, |app| {
            if let Some(text) = request.ask {
                reply.ticket = Some(app.ask(&path, text));
            }

            let mut data = Vec::new();
            if let Some(tickets) = request.tickets {
                let (answered, answers) = app.collect_answers(&path, &tickets);
                reply.answered = Some(answered);
                data.extend(answers);
            }
            data.extend(app.unseen_entries(&path, &ranges));
            reply.data = Some(data);
        });
        Ok(())
    }
}
