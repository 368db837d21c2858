//! Error types for the MemoAI client core.
//!
//! Connection errors describe state machine misuse and handshake or heartbeat
//! failures. Store anomalies (unknown ids, duplicate ids) are not errors at
//! all; the reducer absorbs them as logged no-ops.

use std::time::Duration;

use memoai_proto::ProtocolError;
use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during connection state machine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConnectionError {
    /// Invalid state transition attempted
    #[error("invalid state transition: cannot {operation} from {state:?}")]
    InvalidState {
        /// Current state when error occurred
        state: ConnectionState,
        /// Operation that was attempted
        operation: &'static str,
    },

    /// Received a packet that makes no sense in the current state
    #[error("unexpected {packet} packet in state {state:?}")]
    UnexpectedPacket {
        /// Current state when the packet arrived
        state: ConnectionState,
        /// Packet kind, as logged
        packet: &'static str,
    },

    /// Handshake did not complete within timeout
    #[error("handshake timeout after {elapsed:?}")]
    HandshakeTimeout {
        /// How long we waited
        elapsed: Duration,
    },

    /// Server stopped pinging
    #[error("heartbeat timeout after {elapsed:?}")]
    HeartbeatTimeout {
        /// Time since the last inbound packet
        elapsed: Duration,
    },

    /// Server refused the namespace connect
    #[error("connection refused: {0}")]
    Refused(String),

    /// Protocol error from packet parsing
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Underlying transport error
    #[error("transport error: {0}")]
    Transport(String),
}

impl ConnectionError {
    /// Returns true if retrying the connection may succeed.
    ///
    /// Everything on the network side is transient for this client: the
    /// backend is expected to come back. Only state machine misuse is not.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::InvalidState { .. } | Self::UnexpectedPacket { .. })
    }
}

impl From<ProtocolError> for ConnectionError {
    fn from(err: ProtocolError) -> Self {
        Self::Protocol(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_are_transient() {
        assert!(
            ConnectionError::HandshakeTimeout { elapsed: Duration::from_secs(21) }.is_transient()
        );
        assert!(
            ConnectionError::HeartbeatTimeout { elapsed: Duration::from_secs(146) }.is_transient()
        );
        assert!(ConnectionError::Refused("unauthorized".to_string()).is_transient());
        assert!(ConnectionError::Transport("connection reset".to_string()).is_transient());
    }

    #[test]
    fn misuse_is_not_transient() {
        assert!(
            !ConnectionError::InvalidState {
                state: ConnectionState::Connected,
                operation: "connect",
            }
            .is_transient()
        );
        assert!(
            !ConnectionError::UnexpectedPacket {
                state: ConnectionState::Disconnected,
                packet: "event",
            }
            .is_transient()
        );
    }

    #[test]
    fn protocol_errors_convert() {
        let err: ConnectionError = ProtocolError::Empty.into();
        assert!(matches!(err, ConnectionError::Protocol(_)));
    }
}
