//! Relay errors.
//!
//! No error is fatal. Each one only decides how much of a single exchange
//! is skipped; the reply envelope is always produced.

use thiserror::Error;

/// Reasons a request is not (fully) served.
///
/// These never leave the dispatcher. They are logged and collapsed into the
/// reply envelope, so an unauthorized host-poll looks exactly like one that
/// had nothing to do.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    /// Payload could not be decoded into a request object.
    #[error("malformed request: {0}")]
    MalformedRequest(String),

    /// A field the current step depends on is absent.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// Application id outside the configured range.
    #[error("application id {0} out of range")]
    UnknownApplication(i64),

    /// Host key does not match the registry.
    #[error("unauthorized")]
    Unauthorized,

    /// Action code is not one of the known actions.
    #[error("unknown action {0}")]
    UnknownAction(i64),
}

impl RelayError {
    /// Short, stable label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MalformedRequest(_) => "malformed",
            Self::MissingField(_) => "missing_field",
            Self::UnknownApplication(_) => "unknown_application",
            Self::Unauthorized => "unauthorized",
            Self::UnknownAction(_) => "unknown_action",
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(e: serde_json::Error) -> Self {
        Self::MalformedRequest(e.to_string())
    }
}
