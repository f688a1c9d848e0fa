//! relaypost protocol core
//!
//! In-memory state machine for a relay between one authorized host and any
//! number of anonymous clients per application, split into named channels.
//!
//! This crate provides:
//! - Cursor filtering over caller-supplied seen-ranges
//! - The application key registry
//! - Per-channel broadcast logs with capped retention
//! - Per-channel ask/answer dialog tickets with one-shot delivery
//! - The dispatcher that turns one request into one reply
//! - JSON wire types for requests and replies
//!
//! # Invariants
//!
//! - A key never changes once issued
//! - Broadcast and dialog serials are each strictly increasing process-wide
//! - A channel never retains more than 12 broadcasts
//! - An answer is delivered to a client at most once
//! - No request can fail the process or another connection
//! - Direct use of `unsafe` is forbidden (#![forbid(unsafe_code)])
//!
//! All state is volatile.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::panic))]

pub mod broadcast;
pub mod cursor;
pub mod dialog;
pub mod error;
pub mod key;
pub mod message;
pub mod registry;
pub mod relay;
pub mod state;

pub use cursor::{compress, is_seen, SeenRange};
pub use error::RelayError;
pub use key::AppKey;
pub use message::{
    Action, AnswerEntry, Entry, HostPathData, HostPaths, Request, Response, ANSWER_MARKER,
};
pub use registry::Registry;
pub use relay::{Relay, RelayConfig, DEFAULT_MAX_APPS};
pub use state::RelayState;
