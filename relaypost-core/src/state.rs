//! Shared relay state.
//!
//! ```text
//! RelayState
//!   shards: app_id -> Mutex<AppChannels>
//!                       path -> Channel { BroadcastLog, DialogStore }
//!   broadcast serials (global, atomic)
//!   dialog serials    (global, atomic)
//! ```
//!
//! The critical section is one application: everything a single request
//! does to one application happens under that application's lock. Serial
//! counters are shared by all applications and allocated inside the lock,
//! so within a channel serial order is insertion order.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::broadcast::BroadcastLog;
use crate::cursor::SeenRange;
use crate::dialog::DialogStore;
use crate::message::Entry;

/// Process-wide, strictly increasing serial allocator. First serial is 1.
#[derive(Debug, Default)]
pub struct SerialCounter(AtomicI64);

impl SerialCounter {
    /// Allocate the next serial.
    pub fn next(&self) -> i64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Last serial handed out (0 if none).
    pub fn last(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// One channel: its broadcast log and its dialog tickets.
#[derive(Debug, Default)]
pub struct Channel {
    /// Retained broadcasts.
    pub log: BroadcastLog,
    /// Open and answered tickets.
    pub dialogs: DialogStore,
}

/// Channels of one application, keyed by path.
///
/// Channels materialize on first write and are never removed.
#[derive(Debug, Default)]
pub struct AppChannels {
    channels: HashMap<String, Channel>,
}

impl AppChannels {
    fn channel_mut(&mut self, path: &str) -> &mut Channel {
        self.channels.entry(path.to_owned()).or_default()
    }

    fn channel(&self, path: &str) -> Option<&Channel> {
        self.channels.get(path)
    }

    fn channel_if_exists_mut(&mut self, path: &str) -> Option<&mut Channel> {
        self.channels.get_mut(path)
    }

    /// Number of materialized channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if no channel has been written yet.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

/// Locked view of one application, handed to `RelayState::with_app`.
pub struct AppView<'a> {
    channels: &'a mut AppChannels,
    broadcast_serials: &'a SerialCounter,
    dialog_serials: &'a SerialCounter,
}

impl AppView<'_> {
    /// Publish `text` on `path`. Returns the assigned broadcast serial.
    pub fn publish(&mut self, path: &str, text: String) -> i64 {
        let serial = self.broadcast_serials.next();
        self.channels.channel_mut(path).log.append(serial, text);
        serial
    }

    /// Retained broadcasts on `path` outside `ranges`, ascending.
    pub fn unseen_entries(&self, path: &str, ranges: &[SeenRange]) -> Vec<Entry> {
        self.channels
            .channel(path)
            .map(|c| c.log.unseen(ranges))
            .unwrap_or_default()
    }

    /// Open a ticket on `path`. Returns the ticket id.
    pub fn ask(&mut self, path: &str, text: String) -> i64 {
        let serial = self.dialog_serials.next();
        self.channels.channel_mut(path).dialogs.ask(serial, text);
        serial
    }

    /// Unanswered tickets on `path` outside `ranges`, ascending.
    pub fn pending_asks(&self, path: &str, ranges: &[SeenRange]) -> Vec<Entry> {
        self.channels
            .channel(path)
            .map(|c| c.dialogs.pending_asks(ranges))
            .unwrap_or_default()
    }

    /// Answer ticket `idx` on `path`, creating it if unknown.
    pub fn answer(&mut self, path: &str, idx: i64, text: String) {
        self.channels.channel_mut(path).dialogs.answer(idx, text);
    }

    /// Collect (and delete) answers for `ids` on `path`.
    pub fn collect_answers(&mut self, path: &str, ids: &[i64]) -> (Vec<i64>, Vec<Entry>) {
        self.channels
            .channel_if_exists_mut(path)
            .map(|c| c.dialogs.collect_answers(ids))
            .unwrap_or_default()
    }
}

/// All channel data for all applications.
#[derive(Debug, Default)]
pub struct RelayState {
    shards: DashMap<i64, Arc<Mutex<AppChannels>>>,
    broadcast_serials: SerialCounter,
    dialog_serials: SerialCounter,
}

impl RelayState {
    /// Create empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` with exclusive access to application `app_id`.
    ///
    /// The shard map guard is released before the application lock is
    /// taken, so a slow application never blocks lookups for others.
    pub fn with_app<R>(&self, app_id: i64, f: impl FnOnce(&mut AppView<'_>) -> R) -> R {
        let shard = Arc::clone(self.shards.entry(app_id).or_default().value());
        let mut channels = shard.lock();
        let mut view = AppView {
            channels: &mut *channels,
            broadcast_serials: &self.broadcast_serials,
            dialog_serials: &self.dialog_serials,
        };
        f(&mut view)
    }

    /// See `AppView::publish`.
    pub fn publish(&self, app_id: i64, path: &str, text: impl Into<String>) -> i64 {
        self.with_app(app_id, |app| app.publish(path, text.into()))
    }

    /// See `AppView::unseen_entries`.
    pub fn unseen_entries(&self, app_id: i64, path: &str, ranges: &[SeenRange]) -> Vec<Entry> {
        self.with_app(app_id, |app| app.unseen_entries(path, ranges))
    }

    /// See `AppView::ask`.
    pub fn ask(&self, app_id: i64, path: &str, text: impl Into<String>) -> i64 {
        self.with_app(app_id, |app| app.ask(path, text.into()))
    }

    /// See `AppView::pending_asks`.
    pub fn pending_asks(&self, app_id: i64, path: &str, ranges: &[SeenRange]) -> Vec<Entry> {
        self.with_app(app_id, |app| app.pending_asks(path, ranges))
    }

    /// See `AppView::answer`.
    pub fn answer(&self, app_id: i64, path: &str, idx: i64, text: impl Into<String>) {
        self.with_app(app_id, |app| app.answer(path, idx, text.into()))
    }

    /// See `AppView::collect_answers`.
    pub fn collect_answers(&self, app_id: i64, path: &str, ids: &[i64]) -> (Vec<i64>, Vec<Entry>) {
        self.with_app(app_id, |app| app.collect_answers(path, ids))
    }

    #[cfg(test)]
    fn channel_count(&self, app_id: i64) -> usize {
        self.shards
            .get(&app_id)
            .map(|shard| shard.lock().len())
            .unwrap_or(0)
    }

    /// Last broadcast serial allocated.
    pub fn last_broadcast_serial(&self) -> i64 {
        self.broadcast_serials.last()
    }

    /// Last dialog serial allocated.
    pub fn last_dialog_serial(&self) -> i64 {
        self.dialog_serials.last()
    }
}
