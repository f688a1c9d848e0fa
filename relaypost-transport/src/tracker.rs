//! Seen-serial tracking.
//!
//! Pollers remember what they already processed and send it back as
//! compressed seen-ranges, so the server can skip it.

use std::collections::BTreeSet;

use relaypost_core::{compress, Entry, SeenRange, ANSWER_MARKER};

/// Serials already processed on one channel.
#[derive(Debug, Clone, Default)]
pub struct SeenTracker {
    serials: BTreeSet<i64>,
}

impl SeenTracker {
    /// Empty tracker: everything is unseen.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark one serial as seen.
    pub fn record(&mut self, serial: i64) {
        self.serials.insert(serial);
    }

    /// Mark every delivered entry as seen. Answer markers are ignored.
    pub fn record_entries<'a>(&mut self, entries: impl IntoIterator<Item = &'a Entry>) {
        for entry in entries {
            if entry.idx != ANSWER_MARKER {
                self.serials.insert(entry.idx);
            }
        }
    }

    /// Forget serials below `floor`, e.g. broadcasts the server no longer
    /// retains.
    pub fn prune_below(&mut self, floor: i64) {
        self.serials = self.serials.split_off(&floor);
    }

    /// Seen-ranges to send with the next poll.
    pub fn ranges(&self) -> Vec<SeenRange> {
        compress(self.serials.iter().copied())
    }

    /// Number of serials tracked.
    pub fn len(&self) -> usize {
        self.serials.len()
    }

    /// True if nothing has been seen.
    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }
}
