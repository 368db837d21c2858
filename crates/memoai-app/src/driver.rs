//! Driver trait for abstracting I/O operations.
//!
//! The [`Driver`] trait decouples the application runtime from specific I/O
//! implementations. Each frontend implements the trait to provide
//! platform-specific I/O, while the generic [`crate::Runtime`] handles all
//! orchestration.

use std::{future::Future, ops::Sub, time::Duration};

use memoai_proto::Packet;

use crate::{App, AppAction};

/// Something the live transport reported.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A packet arrived.
    Packet(Packet),
    /// The transport closed or errored on its own.
    Closed {
        /// Why it closed.
        reason: String,
    },
}

/// Abstracts I/O operations for the application runtime.
///
/// Implementations provide platform-specific I/O while the generic
/// [`Runtime`](crate::Runtime) handles orchestration logic. This ensures
/// the same orchestration code runs in the terminal front end and in
/// simulation.
///
/// # Implementations
///
/// - **TUI**: crossterm for terminal events, tokio-tungstenite for the
///   WebSocket
/// - **Simulation**: a scripted in-process backend on virtual time
///
/// # Associated Types
///
/// - [`Error`](Driver::Error): Platform-specific error type
/// - [`Instant`](Driver::Instant): Time representation (real or virtual)
pub trait Driver: Send {
    /// Platform-specific error type.
    type Error: std::error::Error + Send + 'static;

    /// Time instant type. Enables virtual time in simulation.
    type Instant: Copy + Ord + Send + Sync + Sub<Output = Duration>;

    /// Wait briefly for user input and apply it to `app`.
    ///
    /// Returns the actions the input produced, empty if none arrived.
    fn poll_event(
        &mut self,
        app: &mut App,
    ) -> impl Future<Output = Result<Vec<AppAction>, Self::Error>> + Send;

    /// Open a transport to `url`, dropping any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be opened. The runtime
    /// reports it to the client as a failed attempt.
    fn open_transport(&mut self, url: &str)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Close the live transport. A transport closed this way must not be
    /// reported as [`TransportEvent::Closed`].
    fn close_transport(&mut self);

    /// Send a packet on the live transport.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no transport or the send fails.
    fn send_packet(&mut self, packet: Packet)
    -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Next pending transport event, without waiting.
    ///
    /// Returns `None` if nothing is pending.
    fn recv_packet(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Current time instant.
    fn now(&self) -> Self::Instant;

    /// Render the application state.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails.
    fn render(&mut self, app: &App) -> Result<(), Self::Error>;

    /// Stop the transport and clean up resources.
    fn stop(&mut self);
}
