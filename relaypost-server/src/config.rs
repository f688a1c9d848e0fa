//! Server configuration.
//!
//! Values come from, in increasing precedence: built-in defaults, an
//! optional TOML file, command-line flags.

use std::path::Path;

use relaypost_core::{RelayConfig, DEFAULT_MAX_APPS};
use serde::Deserialize;

use crate::error::ServerError;

/// Default listening endpoint.
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Default cap on concurrent connections from one IP address.
pub const DEFAULT_MAX_CONN_PER_IP: usize = 64;

/// Configuration for the relay server.
///
/// ```toml
/// bind = "0.0.0.0:8080"
/// max_apps = 250
/// max_connections_per_ip = 64
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Listening endpoint, `host:port`.
    pub bind: String,
    /// Application ids must satisfy `0 <= id < max_apps`.
    pub max_apps: i64,
    /// Connections beyond this from one IP are dropped after accept.
    pub max_connections_per_ip: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            max_apps: DEFAULT_MAX_APPS,
            max_connections_per_ip: DEFAULT_MAX_CONN_PER_IP,
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file. Missing keys fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw).map_err(|source| ServerError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse TOML text.
    pub fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// The part of the configuration the relay core consumes.
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::default().with_max_apps(self.max_apps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.max_apps, 250);
        assert_eq!(config.relay_config().max_apps, 250);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ServerConfig::parse("max_apps = 10\n").unwrap();
        assert_eq!(config.max_apps, 10);
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.max_connections_per_ip, DEFAULT_MAX_CONN_PER_IP);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(ServerConfig::parse("port = 8080\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"127.0.0.1:9000\"").unwrap();
        writeln!(file, "max_connections_per_ip = 2").unwrap();
        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.bind, "127.0.0.1:9000");
        assert_eq!(config.max_connections_per_ip, 2);
    }

    #[test]
    fn test_load_missing_file() {
        let err = ServerConfig::load(Path::new("/nonexistent/relaypost.toml")).unwrap_err();
        assert!(matches!(err, ServerError::ConfigRead { .. }));
    }
}
