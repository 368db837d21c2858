//! Sans-IO core of the MemoAI client.
//!
//! Everything in this crate is a pure state machine: no sockets, no clocks,
//! no global state. Time and randomness come in through [`env::Environment`]
//! or as explicit arguments, and every transition returns data describing
//! what the caller should do next.
//!
//! # Components
//!
//! - [`store::MessageStore`]: append-only chat log reducer with token
//!   accounting
//! - [`connection::Connection`]: Engine.IO/Socket.IO connection lifecycle with
//!   heartbeat timeout and fixed-delay reconnect
//! - [`smart_join`] and [`tokens`]: the text heuristics used by the store

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod connection;
pub mod env;
pub mod error;
pub mod message;
pub mod smart_join;
pub mod store;
pub mod tokens;

pub use connection::{Connection, ConnectionAction, ConnectionConfig, ConnectionState};
pub use error::ConnectionError;
pub use message::{Message, MessageId, Role};
pub use store::{MessageStore, ReduceOutcome, StoreAction, StoreStats};
