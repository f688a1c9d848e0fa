//! Dialog tickets.
//!
//! A client asks, the host sees the ask in its pending list and answers,
//! the client collects the answer exactly once. Tickets are keyed by
//! serial; the store never blocks waiting for the other side.

use std::collections::BTreeMap;

use crate::cursor::{is_seen, SeenRange};
use crate::message::{Entry, ANSWER_MARKER};

/// One question/answer pair.
///
/// Answering replaces the ticket content, so a ticket holds either an ask
/// or an answer, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ticket {
    /// Waiting for the host.
    Asked(String),
    /// Answered, waiting for the client to collect.
    Answered(String),
}

/// Ticket table for one channel.
#[derive(Debug, Default)]
pub struct DialogStore {
    tickets: BTreeMap<i64, Ticket>,
}

impl DialogStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new ask under an already allocated serial.
    ///
    /// Any earlier content under the same serial (an out-of-band answer)
    /// is discarded.
    pub fn ask(&mut self, serial: i64, text: String) {
        self.tickets.insert(serial, Ticket::Asked(text));
    }

    /// Unanswered tickets not covered by `ranges`, ascending, carrying the
    /// real ticket id.
    pub fn pending_asks(&self, ranges: &[SeenRange]) -> Vec<Entry> {
        self.tickets
            .iter()
            .filter(|(serial, _)| !is_seen(**serial, ranges))
            .filter_map(|(serial, ticket)| match ticket {
                Ticket::Asked(text) => Some(Entry::new(*serial, text.as_str())),
                Ticket::Answered(_) => None,
            })
            .collect()
    }

    /// Set the answer for `idx`, creating the ticket if it does not exist.
    pub fn answer(&mut self, idx: i64, text: String) {
        self.tickets.insert(idx, Ticket::Answered(text));
    }

    /// Collect and delete the answers for `ids`, in the order given.
    ///
    /// Ids that are unknown or still unanswered are skipped. Returns the
    /// ids actually answered and the answers, each tagged with
    /// `ANSWER_MARKER` instead of the real id.
    pub fn collect_answers(&mut self, ids: &[i64]) -> (Vec<i64>, Vec<Entry>) {
        let mut answered = Vec::new();
        let mut answers = Vec::new();
        for &id in ids {
            if !matches!(self.tickets.get(&id), Some(Ticket::Answered(_))) {
                continue;
            }
            if let Some(Ticket::Answered(text)) = self.tickets.remove(&id) {
                answered.push(id);
                answers.push(Entry::new(ANSWER_MARKER, text));
            }
        }
        (answered, answers)
    }

    #[cfg(test)]
    fn get(&self, idx: i64) -> Option<&Ticket> {
        self.tickets.get(&idx)
    }

    /// Number of stored tickets, asked or answered.
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// True if no ticket is stored.
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ask_shows_as_pending() {
        let mut store = DialogStore::new();
        store.ask(1, "hi".into());
        store.ask(2, "there".into());
        assert_eq!(
            store.pending_asks(&[]),
            vec![Entry::new(1, "hi"), Entry::new(2, "there")]
        );
    }

    #[test]
    fn test_seen_asks_are_filtered() {
        let mut store = DialogStore::new();
        for serial in 1..=4 {
            store.ask(serial, format!("q{serial}"));
        }
        let pending = store.pending_asks(&[SeenRange::new(1, 2)]);
        assert_eq!(pending.iter().map(|e| e.idx).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_answer_replaces_ask() {
        let mut store = DialogStore::new();
        store.ask(1, "hi".into());
        store.answer(1, "hello".into());
        assert_eq!(store.get(1), Some(&Ticket::Answered("hello".into())));
        assert!(store.pending_asks(&[]).is_empty());
    }

    #[test]
    fn test_answer_for_unknown_id_is_accepted() {
        let mut store = DialogStore::new();
        store.answer(99, "oob".into());
        let (answered, answers) = store.collect_answers(&[99]);
        assert_eq!(answered, vec![99]);
        assert_eq!(answers, vec![Entry::new(ANSWER_MARKER, "oob")]);
    }

    #[test]
    fn test_collect_is_one_shot() {
        let mut store = DialogStore::new();
        store.ask(1, "hi".into());
        store.answer(1, "hello".into());

        let (answered, answers) = store.collect_answers(&[1]);
        assert_eq!(answered, vec![1]);
        assert_eq!(answers, vec![Entry::new(-1, "hello")]);
        assert!(store.is_empty());

        let (answered, answers) = store.collect_answers(&[1]);
        assert!(answered.is_empty());
        assert!(answers.is_empty());
    }

    #[test]
    fn test_collect_keeps_request_order_and_skips_unanswered() {
        let mut store = DialogStore::new();
        store.ask(1, "a".into());
        store.ask(2, "b".into());
        store.ask(3, "c".into());
        store.answer(3, "C".into());
        store.answer(1, "A".into());

        let (answered, answers) = store.collect_answers(&[3, 2, 7, 1]);
        assert_eq!(answered, vec![3, 1]);
        assert_eq!(answers, vec![Entry::new(-1, "C"), Entry::new(-1, "A")]);
        assert_eq!(store.get(2), Some(&Ticket::Asked("b".into())));
    }

    #[test]
    fn test_duplicate_ids_collect_once() {
        let mut store = DialogStore::new();
        store.answer(5, "x".into());
        let (answered, answers) = store.collect_answers(&[5, 5]);
        assert_eq!(answered, vec![5]);
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn test_new_ask_overrides_stale_answer() {
        let mut store = DialogStore::new();
        store.answer(4, "early".into());
        store.ask(4, "question".into());
        assert_eq!(store.pending_asks(&[]), vec![Entry::new(4, "question")]);
        assert!(store.collect_answers(&[4]).0.is_empty());
    }
}
