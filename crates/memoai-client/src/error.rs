//! Client error types.

use memoai_core::ConnectionError;
use memoai_proto::ProtocolError;
use thiserror::Error;

/// Errors returned by [`Client::handle`](crate::Client::handle).
///
/// None of these are fatal. The caller reports them and keeps feeding
/// events.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A send-type operation was attempted without a live connection.
    #[error("cannot {operation}: not connected")]
    NotConnected {
        /// Operation that was rejected
        operation: &'static str,
    },

    /// Connection state machine rejected an event.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// A packet or payload could not be encoded or decoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
