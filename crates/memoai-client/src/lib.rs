//! Client
//!
//! Action-based realtime client for the MemoAI backend. Owns the single
//! logical connection, turns backend chat events into message store actions,
//! and turns user intents into outbound packets.
//!
//! # Architecture
//!
//! The client follows the same Sans-IO and action-based patterns as
//! [`memoai_core`]. It receives events ([`ClientEvent`]), processes them
//! through pure state machine logic, and returns actions ([`ClientAction`])
//! for the caller to execute.
//!
//! # Components
//!
//! - [`Client`]: Connection lifecycle plus streaming generation tracking
//! - [`ClientEvent`]: Events fed into the client
//! - [`ClientAction`]: Actions produced by the client
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::ConnectedClient`]: WebSocket carrying wire packets
//! - [`transport::connect`]: Connect to a server

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod client;
mod error;
mod event;

#[cfg(feature = "transport")]
pub mod transport;

pub use client::{Client, ClientConfig, Generation, GenerationPhase};
pub use error::ClientError;
pub use event::{ClientAction, ClientEvent, NotificationLevel};
pub use memoai_core::{
    ConnectionState, MessageId,
    env::Environment,
    store::StoreAction,
};
