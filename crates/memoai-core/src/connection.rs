//! Connection lifecycle state machine.
//!
//! Tracks one logical Socket.IO connection to the backend: the Engine.IO
//! handshake, the namespace connect, server heartbeats, and fixed-delay
//! reconnection. Uses the action pattern: methods take time as input and
//! return actions for the driver to execute. The state machine never touches
//! a socket itself.
//!
//! # State Machine
//!
//! ```text
//!                 connect / retry due
//! ┌──────────────┐ ─────────────────> ┌────────────┐  open + connect ack  ┌───────────┐
//! │ Disconnected │                    │ Connecting │ ───────────────────> │ Connected │
//! └──────────────┘ <───────────────── └────────────┘                      └───────────┘
//!        ^          failure / timeout                                           │
//!        └──────────────────────────────────────────────────────────────────────┘
//!                      close / disconnect / heartbeat timeout / reconnect
//! ```
//!
//! Every transition into `Disconnected` schedules a retry `reconnect_delay`
//! later. The retry fires from [`Connection::tick`] unless the caller has
//! suspended it.

use std::{
    ops::Sub,
    time::{Duration, Instant},
};

use memoai_proto::{DEFAULT_NAMESPACE, Packet};

use crate::error::ConnectionError;

/// Time allowed from opening the transport to the namespace connect ack.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(20);

/// Delay between losing the connection and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// Silence tolerated before the server announces its heartbeat settings.
///
/// Matches the backend's 25 s ping interval plus 120 s ping timeout.
pub const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(145);

/// Actions returned by the connection state machine.
///
/// The driver executes these:
/// - `Open`: open a fresh WebSocket transport
/// - `Send`: encode the packet and write it to the transport
/// - `Close`: close the live transport
/// - `Established` / `Lost`: report the lifecycle change upwards
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionAction {
    /// Open a new transport
    Open,

    /// Send this packet to the server
    Send(Packet),

    /// Close the live transport with this reason
    Close {
        /// Reason for closing
        reason: String,
    },

    /// Namespace connect acknowledged, chat traffic may flow
    Established,

    /// Connection dropped or attempt failed
    Lost {
        /// Human readable cause
        reason: String,
    },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport. Initial state.
    Disconnected,
    /// Transport requested, handshake in progress
    Connecting,
    /// Namespace connect acknowledged
    Connected,
}

/// Connection configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Timeout for completing the handshake
    pub handshake_timeout: Duration,
    /// Delay before a scheduled retry fires
    pub reconnect_delay: Duration,
    /// Heartbeat timeout used until the server announces its own
    pub heartbeat_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
        }
    }
}

/// Connection state machine
///
/// Pure: no I/O, no Environment storage. Time is passed as parameters to the
/// methods that need it.
///
/// Generic over `Instant` to support both real time and virtual time for
/// deterministic testing.
#[derive(Debug, Clone)]
pub struct Connection<I = Instant>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    state: ConnectionState,
    config: ConnectionConfig,
    /// Last inbound packet, or the start of the current attempt
    last_activity: I,
    /// When the connection was lost. `Some` while a retry is scheduled.
    lost_at: Option<I>,
    /// Retry scheduling is paused by the caller
    suspended: bool,
    /// `ping_interval + ping_timeout` announced by the server
    heartbeat_timeout: Duration,
    /// Engine.IO session id
    session_id: Option<String>,
    /// Attempts started since the last successful connect
    attempts: u32,
}

impl<I> Connection<I>
where
    I: Copy + Ord + Send + Sync + Sub<Output = Duration>,
{
    /// Create a new connection in [`ConnectionState::Disconnected`] with no
    /// retry scheduled.
    pub fn new(now: I, config: ConnectionConfig) -> Self {
        let heartbeat_timeout = config.heartbeat_timeout;
        Self {
            state: ConnectionState::Disconnected,
            config,
            last_activity: now,
            lost_at: None,
            suspended: false,
            heartbeat_timeout,
            session_id: None,
            attempts: 0,
        }
    }

    /// Current connection state
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Engine.IO session id. `None` until the server's `open` packet.
    #[must_use]
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Connection attempts started since the last successful connect.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether a retry is scheduled (it may still be suspended).
    #[must_use]
    pub fn retry_scheduled(&self) -> bool {
        self.lost_at.is_some()
    }

    /// Whether automatic retries are suspended.
    #[must_use]
    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    /// Current heartbeat timeout.
    #[must_use]
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Start a connection attempt.
    ///
    /// Transitions to Connecting and returns `Open`.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::InvalidState` if not Disconnected
    pub fn connect(&mut self, now: I) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state != ConnectionState::Disconnected {
            return Err(ConnectionError::InvalidState { state: self.state, operation: "connect" });
        }

        Ok(self.begin_attempt(now))
    }

    /// Request a fresh connection from any state.
    ///
    /// Closes a live transport, clears any suspension, and schedules an
    /// attempt `reconnect_delay` from now.
    pub fn reconnect(&mut self, now: I) -> Vec<ConnectionAction> {
        let mut actions = Vec::new();
        if self.state != ConnectionState::Disconnected {
            actions.push(ConnectionAction::Close { reason: "manual reconnect".to_string() });
        }

        self.state = ConnectionState::Disconnected;
        self.session_id = None;
        self.suspended = false;
        self.lost_at = Some(now);
        self.attempts = 0;

        actions
    }

    /// Stop scheduled retries from firing.
    pub fn suspend_retry(&mut self) {
        self.suspended = true;
    }

    /// Let scheduled retries fire again.
    ///
    /// A retry that became due while suspended fires on the next tick.
    pub fn resume_retry(&mut self) {
        self.suspended = false;
    }

    /// The transport failed to open or closed underneath us.
    ///
    /// No-op when already Disconnected: the transport in question is stale.
    pub fn transport_lost(&mut self, now: I, reason: impl Into<String>) -> Vec<ConnectionAction> {
        if self.state == ConnectionState::Disconnected {
            return Vec::new();
        }

        self.lose(now, reason.into(), false)
    }

    /// Elapsed time since last activity, if a timeout is exceeded.
    #[must_use]
    pub fn check_timeout(&self, now: I) -> Option<ConnectionError> {
        let elapsed = now - self.last_activity;

        match self.state {
            ConnectionState::Connecting if elapsed > self.config.handshake_timeout => {
                Some(ConnectionError::HandshakeTimeout { elapsed })
            },
            ConnectionState::Connected if elapsed > self.heartbeat_timeout => {
                Some(ConnectionError::HeartbeatTimeout { elapsed })
            },
            _ => None,
        }
    }

    /// Process periodic maintenance: timeouts and due retries.
    pub fn tick(&mut self, now: I) -> Vec<ConnectionAction> {
        if let Some(err) = self.check_timeout(now) {
            return self.lose(now, err.to_string(), true);
        }

        match (self.state, self.lost_at) {
            (ConnectionState::Disconnected, Some(lost_at))
                if !self.suspended && now - lost_at >= self.config.reconnect_delay =>
            {
                tracing::debug!(attempt = self.attempts + 1, "retrying connection");
                self.begin_attempt(now)
            },
            _ => Vec::new(),
        }
    }

    /// Process an inbound packet.
    ///
    /// Socket.IO events and acks are accepted while Connected but produce no
    /// actions here; interpreting them is the client's job.
    ///
    /// # Errors
    ///
    /// - `ConnectionError::UnexpectedPacket` if the packet is invalid for the
    ///   current state
    pub fn handle_packet(
        &mut self,
        packet: &Packet,
        now: I,
    ) -> Result<Vec<ConnectionAction>, ConnectionError> {
        if self.state == ConnectionState::Disconnected {
            return Err(self.unexpected(packet));
        }

        self.last_activity = now;

        match (self.state, packet) {
            (ConnectionState::Connecting, Packet::Open(handshake)) => {
                self.session_id = Some(handshake.sid.clone());
                self.heartbeat_timeout = Duration::from_millis(
                    handshake.ping_interval.saturating_add(handshake.ping_timeout),
                );
                Ok(vec![ConnectionAction::Send(Packet::connect())])
            },

            (ConnectionState::Connecting, Packet::Connect { namespace, .. })
                if namespace == DEFAULT_NAMESPACE =>
            {
                self.state = ConnectionState::Connected;
                self.attempts = 0;
                self.lost_at = None;
                tracing::info!(sid = ?self.session_id, "connected");
                Ok(vec![ConnectionAction::Established])
            },

            (_, Packet::Ping(probe)) => Ok(vec![ConnectionAction::Send(Packet::Pong(probe.clone()))]),

            (_, Packet::Pong(_) | Packet::Noop) => Ok(vec![]),

            (_, Packet::ConnectError { data, .. }) => {
                let reason = refusal_reason(data);
                Ok(self.lose(now, ConnectionError::Refused(reason).to_string(), true))
            },

            (_, Packet::Close) => Ok(self.lose(now, "server closed the transport".to_string(), true)),

            (_, Packet::Disconnect { .. }) => {
                Ok(self.lose(now, "server disconnected the client".to_string(), true))
            },

            (ConnectionState::Connected, Packet::Event { .. } | Packet::Ack { .. }) => Ok(vec![]),

            _ => Err(self.unexpected(packet)),
        }
    }

    fn begin_attempt(&mut self, now: I) -> Vec<ConnectionAction> {
        self.state = ConnectionState::Connecting;
        self.last_activity = now;
        self.lost_at = None;
        self.session_id = None;
        self.heartbeat_timeout = self.config.heartbeat_timeout;
        self.attempts = self.attempts.saturating_add(1);

        vec![ConnectionAction::Open]
    }

    fn lose(&mut self, now: I, reason: String, close_transport: bool) -> Vec<ConnectionAction> {
        tracing::warn!(%reason, state = ?self.state, "connection lost");

        self.state = ConnectionState::Disconnected;
        self.session_id = None;
        self.lost_at = Some(now);

        let mut actions = Vec::with_capacity(2);
        if close_transport {
            actions.push(ConnectionAction::Close { reason: reason.clone() });
        }
        actions.push(ConnectionAction::Lost { reason });
        actions
    }

    fn unexpected(&self, packet: &Packet) -> ConnectionError {
        ConnectionError::UnexpectedPacket { state: self.state, packet: packet_name(packet) }
    }
}

fn packet_name(packet: &Packet) -> &'static str {
    match packet {
        Packet::Open(_) => "open",
        Packet::Close => "close",
        Packet::Ping(_) => "ping",
        Packet::Pong(_) => "pong",
        Packet::Noop => "noop",
        Packet::Connect { .. } => "connect",
        Packet::Disconnect { .. } => "disconnect",
        Packet::Event { .. } => "event",
        Packet::Ack { .. } => "ack",
        Packet::ConnectError { .. } => "connect_error",
    }
}

/// Socket.IO servers send `{ "message": ... }`; anything else is shown raw.
fn refusal_reason(data: &serde_json::Value) -> String {
    match data.get("message").and_then(serde_json::Value::as_str) {
        Some(message) => message.to_string(),
        None => match data {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        },
    }
}
