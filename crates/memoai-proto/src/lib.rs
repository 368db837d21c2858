//! MemoAI wire protocol.
//!
//! The backend speaks Socket.IO v4 over an Engine.IO v4 WebSocket transport.
//! Every WebSocket text frame carries exactly one [`Packet`]; chat traffic is
//! carried in Socket.IO event packets whose payloads are defined in
//! [`event`].
//!
//! # Layers
//!
//! - [`Packet`]: Engine.IO framing with the embedded Socket.IO packet already
//!   parsed. Encoding and decoding are total over the supported subset; binary
//!   attachments are rejected.
//! - [`event`]: typed payloads for `chat_message`, `stop_generation` and the
//!   four inbound chat events.
//! - [`endpoint`]: derivation of the WebSocket URL from the HTTP base URL.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod endpoint;
pub mod errors;
pub mod event;
mod packet;
mod timestamp;

pub use errors::{ProtocolError, Result};
pub use event::{InboundEvent, OutboundEvent};
pub use packet::{DEFAULT_NAMESPACE, EngineKind, OpenHandshake, Packet, SocketKind};
pub use timestamp::{format_timestamp, parse_timestamp};
