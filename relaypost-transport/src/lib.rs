//! relaypost transport
//!
//! Async client library for the relaypost server, used by both sides:
//!
//! - **Hosts** register once per application, then poll with their key to
//!   publish broadcasts, answer tickets and discover pending asks.
//! - **Clients** poll anonymously to ask questions, collect answers and read
//!   broadcasts.
//!
//! # Invariants
//!
//! - **One exchange per call**: every method sends one request and reads
//!   exactly one reply. No pushes, no background tasks.
//! - **TLS by default**: plain `ws://` is refused unless `insecure_dev` is set,
//!   since host-polls carry the application key.
//! - **No Duplication**: `RelayClient` and `AppKey` do not implement `Clone`.
//! - **Silent server**: the server never reports errors. Ignored requests
//!   surface as `TransportError::Ignored`.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod client;
pub mod config;
pub mod error;
mod relay;
pub mod tracker;

pub use client::{ClientPoll, ClientPollReply, HostPoll, RelayClient};
pub use config::ClientConfig;
pub use error::TransportError;
pub use relaypost_core::{AppKey, Entry, SeenRange};
pub use tracker::SeenTracker;
