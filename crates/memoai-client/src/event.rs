//! Client events and actions.

use std::fmt;

use memoai_core::{ConnectionState, store::StoreAction};
use memoai_proto::Packet;

/// Events the caller feeds into the client.
///
/// The caller is responsible for:
/// - Opening and closing the transport when asked, and reporting how that
///   went
/// - Receiving packets from the transport
/// - Driving time forward via ticks
/// - Forwarding user intents (send message, stop, reconnect)
///
/// Generic over `I` (Instant type) to support both production
/// (`std::time::Instant`) and simulation (virtual time) environments.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent<I = std::time::Instant> {
    /// Begin the first connection attempt.
    Start,

    /// The transport requested by `OpenTransport` is open.
    TransportOpened,

    /// The transport requested by `OpenTransport` could not be opened.
    TransportFailed {
        /// Why the attempt failed.
        reason: String,
    },

    /// The live transport closed or errored.
    TransportClosed {
        /// Why it closed.
        reason: String,
    },

    /// Packet received from the server.
    PacketReceived(Packet),

    /// Time tick for timeout and retry processing.
    ///
    /// The caller should send ticks periodically so the client can detect
    /// dead connections and fire scheduled retries.
    Tick {
        /// Current time from the environment.
        now: I,
    },

    /// User wants to send a chat message.
    SendMessage {
        /// Message text.
        text: String,
        /// Whether the answer should be streamed.
        streaming: bool,
    },

    /// User wants to stop the answer being generated.
    StopGeneration,

    /// User wants to drop the connection and start over.
    Reconnect,

    /// Pause automatic reconnection.
    SuspendReconnect,

    /// Resume automatic reconnection.
    ResumeReconnect,

    /// The chat log was emptied. Messages the client referred to are gone.
    MessagesCleared,
}

/// Severity of a user-visible notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationLevel {
    /// Something went well.
    Success,
    /// Something failed.
    Error,
    /// Neutral information.
    Info,
    /// Something degraded but recoverable.
    Warning,
}

impl fmt::Display for NotificationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Info => "info",
            Self::Warning => "warning",
        };
        f.write_str(label)
    }
}

/// Actions the client produces for the caller to execute.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientAction {
    /// Open a WebSocket transport to this URL.
    OpenTransport {
        /// Full Engine.IO WebSocket URL.
        url: String,
    },

    /// Close the live transport.
    ///
    /// The caller must not report a `TransportClosed` event for a transport
    /// it closed on request.
    CloseTransport,

    /// Send a packet to the server.
    Send(Packet),

    /// Apply this action to the message store.
    Store(StoreAction),

    /// Set the global loading indicator.
    SetLoading(bool),

    /// Show a notification to the user.
    Notify {
        /// Severity.
        level: NotificationLevel,
        /// Text.
        message: String,
    },

    /// Connection state changed.
    ConnectionChanged(ConnectionState),
}
