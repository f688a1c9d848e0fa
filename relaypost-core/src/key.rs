//! Application keys.
//!
//! The key is the only thing standing between an anonymous peer and host
//! privileges, so it is drawn from the OS CSPRNG, held in zeroizing storage
//! and compared in constant time.

use rand::distributions::Alphanumeric;
use rand::rngs::OsRng;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Length of a generated key in characters.
pub const APP_KEY_LEN: usize = 64;

/// A secret application key that zeroizes on Drop.
///
/// This type does not implement `Clone`. Callers that need to ship the key
/// somewhere copy it out explicitly through `as_str()`.
pub struct AppKey(Zeroizing<String>);

impl AppKey {
    /// Generate a fresh `[0-9A-Za-z]` key of `APP_KEY_LEN` characters.
    pub fn generate() -> Self {
        let key: String = OsRng
            .sample_iter(&Alphanumeric)
            .take(APP_KEY_LEN)
            .map(char::from)
            .collect();
        Self(Zeroizing::new(key))
    }

    /// Wrap a key received from the server.
    pub fn from_string(key: String) -> Self {
        Self(Zeroizing::new(key))
    }

    /// Get the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exact comparison against a candidate, in constant time.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.as_bytes().ct_eq(candidate.as_bytes()).into()
    }

    /// Truncated SHA-256 of the key, safe to put in logs.
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0.as_bytes());
        hex::encode(&digest[..8])
    }
}

impl std::fmt::Debug for AppKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("AppKey").field(&self.fingerprint()).finish()
    }
}

// Explicitly NOT implementing Clone to keep key copies deliberate.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_key_shape() {
        let key = AppKey::generate();
        assert_eq!(key.as_str().len(), APP_KEY_LEN);
        assert!(key.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_keys_differ() {
        assert_ne!(AppKey::generate().as_str(), AppKey::generate().as_str());
    }

    #[test]
    fn test_matches_is_exact() {
        let key = AppKey::from_string("abc123".to_string());
        assert!(key.matches("abc123"));
        assert!(!key.matches("abc12"));
        assert!(!key.matches("abc1234"));
        assert!(!key.matches("ABC123"));
        assert!(!key.matches(""));
    }

    #[test]
    fn test_debug_does_not_leak() {
        let key = AppKey::from_string("supersecretvalue".to_string());
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains("supersecretvalue"));
        assert!(rendered.contains(&key.fingerprint()));
        assert_eq!(key.fingerprint().len(), 16);
    }
}
