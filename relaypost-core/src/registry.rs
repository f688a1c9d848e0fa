//! Application registry.
//!
//! Maps an application id to its secret key. Entries are created on the
//! first registration and live for the lifetime of the process.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use crate::key::AppKey;

/// Application id to key mapping.
///
/// Ids are not range-checked here; the dispatcher does that first.
#[derive(Debug, Default)]
pub struct Registry {
    keys: DashMap<i64, AppKey>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the key for `app_id`, issuing one if none exists yet.
    ///
    /// Issuance is atomic per id: concurrent callers observe the same key.
    pub fn register_or_get_key(&self, app_id: i64) -> String {
        match self.keys.entry(app_id) {
            Entry::Occupied(e) => e.get().as_str().to_owned(),
            Entry::Vacant(v) => {
                let key = AppKey::generate();
                info!(app_id, fingerprint = %key.fingerprint(), "issued application key");
                v.insert(key).as_str().to_owned()
            }
        }
    }

    /// Exact match of `candidate` against the stored key.
    ///
    /// Unregistered ids never match.
    pub fn check_key(&self, app_id: i64, candidate: &str) -> bool {
        self.keys
            .get(&app_id)
            .map(|key| key.matches(candidate))
            .unwrap_or(false)
    }

    /// Number of registered applications.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True if no application has registered yet.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_register_is_idempotent() {
        let registry = Registry::new();
        let first = registry.register_or_get_key(3);
        let second = registry.register_or_get_key(3);
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_distinct_ids_get_distinct_keys() {
        let registry = Registry::new();
        let a = registry.register_or_get_key(1);
        let b = registry.register_or_get_key(2);
        assert_ne!(a, b);
    }

    #[test]
    fn test_check_key() {
        let registry = Registry::new();
        let key = registry.register_or_get_key(7);
        assert!(registry.check_key(7, &key));
        assert!(!registry.check_key(7, "wrong"));
        assert!(!registry.check_key(8, &key));
    }

    #[test]
    fn test_unregistered_never_matches() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(!registry.check_key(0, ""));
    }

    #[test]
    fn test_concurrent_registration_agrees() {
        let registry = Arc::new(Registry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.register_or_get_key(42))
            })
            .collect();
        let keys: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(keys.windows(2).all(|w| w[0] == w[1]));
    }
}
