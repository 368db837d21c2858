//! Protocol errors.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding or decoding wire packets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame was empty.
    #[error("empty packet")]
    Empty,

    /// Engine.IO packet type is not known.
    #[error("unknown engine.io packet type {0:?}")]
    UnknownEngineType(char),

    /// Socket.IO packet type is not known.
    #[error("unknown socket.io packet type {0:?}")]
    UnknownSocketType(char),

    /// Packet type is valid but not supported by this client.
    #[error("unsupported packet: {0}")]
    Unsupported(&'static str),

    /// Packet body is not valid JSON or has the wrong shape.
    #[error("malformed {context}: {reason}")]
    Malformed {
        /// What was being parsed.
        context: &'static str,
        /// Why it failed.
        reason: String,
    },
}

impl ProtocolError {
    pub(crate) fn malformed(context: &'static str, reason: impl ToString) -> Self {
        Self::Malformed { context, reason: reason.to_string() }
    }
}
