//! Broadcast log.
//!
//! Each channel keeps its most recent broadcasts so that clients polling
//! late can still pick them up. Retention is a hard cap, newest wins.

use std::collections::BTreeMap;

use crate::cursor::{is_seen, SeenRange};
use crate::message::Entry;

/// Maximum broadcasts retained per channel.
pub const BROADCAST_RETENTION: usize = 12;

/// Ordered serial → text log for one channel.
#[derive(Debug, Default)]
pub struct BroadcastLog {
    entries: BTreeMap<i64, String>,
}

impl BroadcastLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry under an already allocated serial, then drop the
    /// oldest entries until at most `BROADCAST_RETENTION` remain.
    pub fn append(&mut self, serial: i64, text: String) {
        self.entries.insert(serial, text);
        while self.entries.len() > BROADCAST_RETENTION {
            self.entries.pop_first();
        }
    }

    /// Retained entries not covered by `ranges`, ascending by serial.
    pub fn unseen(&self, ranges: &[SeenRange]) -> Vec<Entry> {
        self.entries
            .iter()
            .filter(|(serial, _)| !is_seen(**serial, ranges))
            .map(|(serial, text)| Entry::new(*serial, text.as_str()))
            .collect()
    }

    #[cfg(test)]
    fn serials(&self) -> Vec<i64> {
        self.entries.keys().copied().collect()
    }

    /// Number of retained entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing was ever published here.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_newest_twelve() {
        let mut log = BroadcastLog::new();
        for serial in 1..=13 {
            log.append(serial, format!("msg {serial}"));
        }
        assert_eq!(log.len(), BROADCAST_RETENTION);
        assert_eq!(log.serials(), (2..=13).collect::<Vec<_>>());
    }

    #[test]
    fn test_cap_holds_under_many_appends() {
        let mut log = BroadcastLog::new();
        for serial in 1..=100 {
            log.append(serial, String::new());
            assert!(log.len() <= BROADCAST_RETENTION);
        }
        assert_eq!(log.serials(), (89..=100).collect::<Vec<_>>());
    }

    #[test]
    fn test_out_of_order_serials_evict_smallest() {
        let mut log = BroadcastLog::new();
        for serial in (1..=12).map(|s| s * 10) {
            log.append(serial, String::new());
        }
        log.append(5, String::new());
        assert_eq!(log.len(), BROADCAST_RETENTION);
        assert!(!log.serials().contains(&5));
        assert_eq!(log.serials()[0], 10);
    }

    #[test]
    fn test_unseen_filters_and_orders() {
        let mut log = BroadcastLog::new();
        for serial in [4, 1, 3, 2] {
            log.append(serial, format!("m{serial}"));
        }
        let all = log.unseen(&[]);
        assert_eq!(all.iter().map(|e| e.idx).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(all[0].text, "m1");

        let rest = log.unseen(&[SeenRange::new(1, 2)]);
        assert_eq!(rest.iter().map(|e| e.idx).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_empty_log() {
        let log = BroadcastLog::new();
        assert!(log.is_empty());
        assert!(log.unseen(&[]).is_empty());
    }
}
