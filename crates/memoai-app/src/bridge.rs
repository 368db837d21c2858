//! Protocol-to-Application translation layer.
//!
//! The [`Bridge`] wraps the [`memoai_client::Client`] and adapts it to the
//! application lifecycle.
//!
//! # Responsibilities
//!
//! - Converts [`crate::AppAction`] intents into client events.
//! - Queues [`TransportCommand`]s (open, send, close) in the order the client
//!   produced them, to be executed by the driver in the next I/O cycle.
//! - Interprets results from the client and converts them back into
//!   [`crate::AppEvent`]s to update the UI.
//! - Manages time ticks generically to support both real-time execution and
//!   deterministic simulation.

use memoai_client::{
    Client, ClientAction, ClientConfig, ClientError, ClientEvent, Environment, NotificationLevel,
};
use memoai_proto::Packet;

use crate::{AppAction, AppEvent};

/// Notification text for chat operations attempted while offline.
pub const NOT_CONNECTED_MESSAGE: &str = "No connection to server";

/// Transport work for the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCommand {
    /// Open a WebSocket to this URL, replacing any previous one.
    Open {
        /// Full Engine.IO WebSocket URL.
        url: String,
    },
    /// Send a packet on the live transport.
    Send(Packet),
    /// Close the live transport without reporting it as closed.
    Close,
}

/// Bridge between App and Client protocol logic.
///
/// Generic over Environment to support both production and simulation.
/// The Instant type is determined by the Environment's associated type.
pub struct Bridge<E: Environment> {
    client: Client<E>,
    env: E,
    commands: Vec<TransportCommand>,
}

impl<E: Environment> Bridge<E> {
    /// Create a new Bridge with the given environment and configuration.
    pub fn new(env: E, config: ClientConfig) -> Self {
        let client = Client::new(env.clone(), config);
        Self { client, env, commands: Vec::new() }
    }

    /// Underlying client.
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    /// Begin connecting.
    pub fn start(&mut self) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::Start);
        self.handle_client_result(result)
    }

    /// Process an App action and return resulting App events.
    pub fn process_app_action(&mut self, action: AppAction) -> Vec<AppEvent> {
        let event = match action {
            AppAction::SendMessage { text, streaming } => {
                ClientEvent::SendMessage { text, streaming }
            },
            AppAction::StopGeneration => ClientEvent::StopGeneration,
            AppAction::Reconnect => ClientEvent::Reconnect,
            AppAction::SuspendReconnect => ClientEvent::SuspendReconnect,
            AppAction::ResumeReconnect => ClientEvent::ResumeReconnect,
            AppAction::MessagesCleared => ClientEvent::MessagesCleared,
            AppAction::Render | AppAction::Quit | AppAction::SavePreferences(_) => {
                return vec![];
            },
        };

        let result = self.client.handle(event);
        self.handle_client_result(result)
    }

    /// The transport requested by [`TransportCommand::Open`] is up.
    pub fn transport_opened(&mut self) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::TransportOpened);
        self.handle_client_result(result)
    }

    /// The transport requested by [`TransportCommand::Open`] failed.
    pub fn transport_failed(&mut self, reason: String) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::TransportFailed { reason });
        self.handle_client_result(result)
    }

    /// The live transport closed on its own.
    pub fn transport_closed(&mut self, reason: String) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::TransportClosed { reason });
        self.handle_client_result(result)
    }

    /// Handle a packet from the server.
    pub fn handle_packet(&mut self, packet: Packet) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::PacketReceived(packet));
        self.handle_client_result(result)
    }

    /// Process a time tick.
    pub fn handle_tick(&mut self, now: E::Instant) -> Vec<AppEvent> {
        let result = self.client.handle(ClientEvent::Tick { now });
        self.handle_client_result(result)
    }

    /// Take pending transport commands, oldest first.
    pub fn take_commands(&mut self) -> Vec<TransportCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Whether transport commands are waiting.
    pub fn has_commands(&self) -> bool {
        !self.commands.is_empty()
    }

    fn handle_client_result(
        &mut self,
        result: Result<Vec<ClientAction>, ClientError>,
    ) -> Vec<AppEvent> {
        match result {
            Ok(actions) => self.process_client_actions(actions),
            Err(ClientError::NotConnected { operation }) => {
                tracing::debug!(operation, "rejected while offline");
                vec![AppEvent::Notify {
                    level: NotificationLevel::Error,
                    message: NOT_CONNECTED_MESSAGE.to_string(),
                    timestamp: self.env.wall_clock(),
                }]
            },
            Err(e) => {
                tracing::warn!("Client rejected input: {e}");
                vec![]
            },
        }
    }

    fn process_client_actions(&mut self, actions: Vec<ClientAction>) -> Vec<AppEvent> {
        let mut events = Vec::new();

        for action in actions {
            match action {
                ClientAction::OpenTransport { url } => {
                    self.commands.push(TransportCommand::Open { url });
                },
                ClientAction::CloseTransport => {
                    self.commands.push(TransportCommand::Close);
                },
                ClientAction::Send(packet) => {
                    self.commands.push(TransportCommand::Send(packet));
                },
                ClientAction::Store(action) => {
                    events.push(AppEvent::Store(action));
                },
                ClientAction::SetLoading(loading) => {
                    events.push(AppEvent::Loading(loading));
                },
                ClientAction::Notify { level, message } => {
                    events.push(AppEvent::Notify {
                        level,
                        message,
                        timestamp: self.env.wall_clock(),
                    });
                },
                ClientAction::ConnectionChanged(state) => {
                    events.push(AppEvent::ConnectionChanged(state));
                },
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU8, Ordering},
        },
        time::{Duration, Instant},
    };

    use chrono::{DateTime, Utc};
    use memoai_core::ConnectionState;
    use memoai_proto::OpenHandshake;

    use super::*;

    #[derive(Clone)]
    struct TestEnv {
        start: Instant,
        seed: Arc<AtomicU8>,
    }

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.start
        }

        fn wall_clock(&self) -> DateTime<Utc> {
            DateTime::from_timestamp(1_700_000_000, 0).unwrap()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let seed = self.seed.fetch_add(1, Ordering::Relaxed);
            buffer.fill(seed);
        }
    }

    fn bridge() -> Bridge<TestEnv> {
        let env = TestEnv { start: Instant::now(), seed: Arc::new(AtomicU8::new(1)) };
        Bridge::new(env, ClientConfig::default())
    }

    fn connected_bridge() -> Bridge<TestEnv> {
        let mut bridge = bridge();
        let _ = bridge.start();
        let _ = bridge.transport_opened();
        let _ = bridge.handle_packet(Packet::Open(OpenHandshake {
            sid: "s1".into(),
            upgrades: vec![],
            ping_interval: 25_000,
            ping_timeout: 20_000,
            max_payload: 1_000_000,
        }));
        let _ = bridge.handle_packet(Packet::connect());
        let _ = bridge.take_commands();
        bridge
    }

    #[test]
    fn start_queues_open() {
        let mut bridge = bridge();
        let events = bridge.start();

        assert_eq!(events, vec![AppEvent::ConnectionChanged(ConnectionState::Connecting)]);
        assert!(matches!(bridge.take_commands().as_slice(), [TransportCommand::Open { .. }]));
        assert!(!bridge.has_commands());
    }

    #[test]
    fn handshake_reply_is_queued_as_send() {
        let mut bridge = bridge();
        let _ = bridge.start();
        let _ = bridge.take_commands();

        let _ = bridge.handle_packet(Packet::Open(OpenHandshake {
            sid: "s1".into(),
            upgrades: vec![],
            ping_interval: 25_000,
            ping_timeout: 20_000,
            max_payload: 1_000_000,
        }));

        assert_eq!(bridge.take_commands(), vec![TransportCommand::Send(Packet::connect())]);
    }

    #[test]
    fn send_while_offline_notifies() {
        let mut bridge = bridge();

        let events = bridge
            .process_app_action(AppAction::SendMessage { text: "hi".into(), streaming: true });

        assert!(matches!(events.as_slice(), [AppEvent::Notify {
            level: NotificationLevel::Error,
            message,
            ..
        }] if message == NOT_CONNECTED_MESSAGE));
        assert!(!bridge.has_commands());
    }

    #[test]
    fn send_when_connected_adds_message_and_queues_packet() {
        let mut bridge = connected_bridge();

        let events = bridge
            .process_app_action(AppAction::SendMessage { text: "hi".into(), streaming: true });

        assert!(matches!(events.as_slice(), [
            AppEvent::Store(memoai_core::StoreAction::AddMessage { .. }),
            AppEvent::Loading(true)
        ]));
        assert!(matches!(bridge.take_commands().as_slice(), [TransportCommand::Send(
            Packet::Event { .. }
        )]));
    }

    #[test]
    fn ui_only_actions_do_not_reach_client() {
        let mut bridge = connected_bridge();

        assert!(bridge.process_app_action(AppAction::Render).is_empty());
        assert!(bridge.process_app_action(AppAction::Quit).is_empty());
        assert!(!bridge.has_commands());
    }

    #[test]
    fn reconnect_closes_transport() {
        let mut bridge = connected_bridge();

        let events = bridge.process_app_action(AppAction::Reconnect);

        assert_eq!(events, vec![AppEvent::ConnectionChanged(ConnectionState::Disconnected)]);
        assert_eq!(bridge.take_commands(), vec![TransportCommand::Close]);
    }
}
