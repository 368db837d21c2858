//! Client state machine.
//!
//! The `Client` owns the connection lifecycle and the streaming target: the
//! id of the assistant message currently receiving chunks. It is the only
//! component that decides which store actions a backend event turns into.

use memoai_core::{
    Connection, ConnectionAction, ConnectionConfig, ConnectionError, ConnectionState, Message,
    MessageId, Role,
    env::Environment,
    store::StoreAction,
};
use memoai_proto::{
    InboundEvent, OutboundEvent, Packet,
    endpoint::{DEFAULT_BASE_URL, websocket_url},
    event::{ChatChunk, ChatComplete, ChatError, ChatMessage, GenerationStopped, StopGeneration},
};

use crate::{
    error::ClientError,
    event::{ClientAction, ClientEvent, NotificationLevel},
};

/// Client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend HTTP base URL, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Connection timing.
    pub connection: ConnectionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_BASE_URL.to_string(), connection: ConnectionConfig::default() }
    }
}

/// Where the current generation stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    /// Nothing sent yet.
    Idle,
    /// A message was sent; the answer is pending or streaming.
    Active,
    /// The user stopped the answer locally. Late chunk, complete and stop
    /// events are dropped until the next message is sent.
    Stopped,
    /// The answer completed, failed or was stopped by the server.
    Finished,
}

/// Monotonic generation record.
///
/// `counter` increments on every sent message; `phase` tracks how the latest
/// generation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation {
    /// Number of messages sent on this client.
    pub counter: u64,
    /// Phase of the latest generation.
    pub phase: GenerationPhase,
}

/// Realtime chat client.
pub struct Client<E: Environment> {
    /// Environment for time, randomness and wall clock.
    env: E,

    /// WebSocket URL derived from the configured base URL.
    url: String,

    /// Connection lifecycle.
    connection: Connection<E::Instant>,

    /// Message receiving chunks. Non-owning: the store owns messages.
    streaming_target: Option<MessageId>,

    /// Latest generation.
    generation: Generation,

    /// Whether a connection was ever established.
    was_connected: bool,
}

impl<E: Environment> Client<E> {
    /// Create a disconnected client. Nothing happens until
    /// [`ClientEvent::Start`].
    pub fn new(env: E, config: ClientConfig) -> Self {
        let connection = Connection::new(env.now(), config.connection);
        Self {
            url: websocket_url(&config.base_url),
            env,
            connection,
            streaming_target: None,
            generation: Generation { counter: 0, phase: GenerationPhase::Idle },
            was_connected: false,
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Whether chat traffic can be sent.
    pub fn is_connected(&self) -> bool {
        self.connection.state() == ConnectionState::Connected
    }

    /// Message currently receiving chunks.
    pub fn streaming_target(&self) -> Option<MessageId> {
        self.streaming_target
    }

    /// Latest generation record.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// WebSocket URL this client connects to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Underlying connection state machine.
    pub fn connection(&self) -> &Connection<E::Instant> {
        &self.connection
    }

    /// Process an event and return resulting actions.
    ///
    /// # Errors
    ///
    /// - `ClientError::NotConnected` for send or stop without a connection;
    ///   nothing is transmitted and no state changes
    /// - `ClientError::Connection` for packets the connection cannot accept
    /// - `ClientError::Protocol` for payloads that fail to encode or decode
    pub fn handle(
        &mut self,
        event: ClientEvent<E::Instant>,
    ) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::Start => {
                let now = self.env.now();
                self.with_connection(|conn| conn.connect(now))
            },
            ClientEvent::TransportOpened => {
                tracing::debug!(url = %self.url, "transport open, awaiting handshake");
                Ok(Vec::new())
            },
            ClientEvent::TransportFailed { reason } | ClientEvent::TransportClosed { reason } => {
                let now = self.env.now();
                self.with_connection(|conn| Ok(conn.transport_lost(now, reason)))
            },
            ClientEvent::PacketReceived(packet) => self.handle_packet(&packet),
            ClientEvent::Tick { now } => self.with_connection(|conn| Ok(conn.tick(now))),
            ClientEvent::SendMessage { text, streaming } => self.send_message(text, streaming),
            ClientEvent::StopGeneration => self.stop_generation(),
            ClientEvent::Reconnect => {
                let now = self.env.now();
                let mut actions = self.with_connection(|conn| Ok(conn.reconnect(now)))?;
                self.abandon_generation(&mut actions);
                Ok(actions)
            },
            ClientEvent::SuspendReconnect => {
                self.connection.suspend_retry();
                Ok(Vec::new())
            },
            ClientEvent::ResumeReconnect => {
                self.connection.resume_retry();
                Ok(Vec::new())
            },
            ClientEvent::MessagesCleared => {
                // The next chunk or complete starts a fresh assistant message
                if let Some(id) = self.streaming_target.take() {
                    tracing::debug!(%id, "streaming target cleared");
                }
                Ok(Vec::new())
            },
        }
    }

    fn send_message(
        &mut self,
        text: String,
        streaming: bool,
    ) -> Result<Vec<ClientAction>, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected { operation: "send message" });
        }

        let timestamp = self.env.wall_clock();
        let packet = OutboundEvent::ChatMessage(ChatMessage {
            message: text.clone(),
            streaming,
            timestamp,
        })
        .into_packet()?;

        let mut actions = Vec::with_capacity(4);
        // A target still streaming here never got its complete event.
        self.finalize_target(&mut actions);

        let message = Message::new(MessageId::generate(&self.env), Role::User, text, timestamp);
        actions.push(ClientAction::Store(StoreAction::AddMessage { message }));
        actions.push(ClientAction::SetLoading(true));
        actions.push(ClientAction::Send(packet));

        self.generation.counter += 1;
        self.generation.phase = GenerationPhase::Active;
        tracing::debug!(generation = self.generation.counter, streaming, "message sent");

        Ok(actions)
    }

    fn stop_generation(&mut self) -> Result<Vec<ClientAction>, ClientError> {
        if !self.is_connected() {
            return Err(ClientError::NotConnected { operation: "stop generation" });
        }

        let packet =
            OutboundEvent::StopGeneration(StopGeneration { timestamp: self.env.wall_clock() })
                .into_packet()?;

        let mut actions = vec![ClientAction::Send(packet), ClientAction::SetLoading(false)];
        self.finalize_target(&mut actions);
        actions.push(ClientAction::Notify {
            level: NotificationLevel::Info,
            message: "Generation stopped".to_string(),
        });

        self.generation.phase = GenerationPhase::Stopped;
        Ok(actions)
    }

    fn handle_packet(&mut self, packet: &Packet) -> Result<Vec<ClientAction>, ClientError> {
        let now = self.env.now();
        let mut actions = self.with_connection(|conn| conn.handle_packet(packet, now))?;

        if self.is_connected() {
            if let Some(event) = InboundEvent::from_packet(packet)? {
                actions.extend(self.handle_inbound(event));
            }
        }

        Ok(actions)
    }

    fn handle_inbound(&mut self, event: InboundEvent) -> Vec<ClientAction> {
        let late = self.generation.phase == GenerationPhase::Stopped;

        match event {
            InboundEvent::Chunk(_) | InboundEvent::Complete(_) if late => {
                tracing::debug!(kind = event.kind(), "dropping event after local stop");
                Vec::new()
            },
            InboundEvent::Chunk(chunk) => self.on_chunk(chunk),
            InboundEvent::Complete(complete) => self.on_complete(complete),
            InboundEvent::Error(error) => self.on_error(&error),
            InboundEvent::Stopped(stopped) => self.on_stopped(&stopped),
            InboundEvent::Other { name, .. } => {
                tracing::debug!(%name, "ignoring event");
                Vec::new()
            },
        }
    }

    fn on_chunk(&mut self, chunk: ChatChunk) -> Vec<ClientAction> {
        self.generation.phase = GenerationPhase::Active;

        if let Some(id) = self.streaming_target {
            let action = match chunk {
                ChatChunk { chunk: Some(text), .. } => {
                    StoreAction::AppendChunk { id, chunk: text, streaming: Some(true) }
                },
                ChatChunk { chunk: None, accumulated: Some(text) } => {
                    StoreAction::UpdateMessage { id, content: Some(text), streaming: Some(true) }
                },
                ChatChunk { chunk: None, accumulated: None } => return Vec::new(),
            };
            return vec![ClientAction::Store(action)];
        }

        let Some(text) = chunk.chunk.or(chunk.accumulated) else {
            return Vec::new();
        };

        let id = MessageId::generate(&self.env);
        let message =
            Message::new(id, Role::Assistant, text, self.env.wall_clock()).streaming(true);
        self.streaming_target = Some(id);

        vec![ClientAction::Store(StoreAction::AddMessage { message })]
    }

    fn on_complete(&mut self, complete: ChatComplete) -> Vec<ClientAction> {
        self.generation.phase = GenerationPhase::Finished;

        let action = match self.streaming_target.take() {
            Some(id) => StoreAction::UpdateMessage {
                id,
                content: Some(complete.response),
                streaming: Some(false),
            },
            None => {
                let timestamp = complete.completed_at().unwrap_or_else(|| self.env.wall_clock());
                let message = Message::new(
                    MessageId::generate(&self.env),
                    Role::Assistant,
                    complete.response,
                    timestamp,
                );
                StoreAction::AddMessage { message }
            },
        };

        vec![ClientAction::Store(action), ClientAction::SetLoading(false)]
    }

    fn on_error(&mut self, error: &ChatError) -> Vec<ClientAction> {
        tracing::warn!(error = %error.error, "backend reported an error");

        let mut actions = vec![
            ClientAction::Notify {
                level: NotificationLevel::Error,
                message: format!("Server error: {}", error.error),
            },
            ClientAction::SetLoading(false),
        ];
        self.finalize_target(&mut actions);

        if self.generation.phase != GenerationPhase::Stopped {
            self.generation.phase = GenerationPhase::Finished;
        }
        actions
    }

    fn on_stopped(&mut self, stopped: &GenerationStopped) -> Vec<ClientAction> {
        tracing::debug!(note = ?stopped.message, "server stopped generation");

        let mut actions = vec![ClientAction::SetLoading(false)];
        self.finalize_target(&mut actions);
        self.generation.phase = GenerationPhase::Finished;
        actions
    }

    /// Mark the streaming target as finished and forget it.
    fn finalize_target(&mut self, actions: &mut Vec<ClientAction>) {
        if let Some(id) = self.streaming_target.take() {
            actions.push(ClientAction::Store(StoreAction::UpdateMessage {
                id,
                content: None,
                streaming: Some(false),
            }));
        }
    }

    /// Run a connection transition and translate what it returns.
    fn with_connection<F>(&mut self, transition: F) -> Result<Vec<ClientAction>, ClientError>
    where
        F: FnOnce(
            &mut Connection<E::Instant>,
        ) -> Result<Vec<ConnectionAction>, ConnectionError>,
    {
        let before = self.connection.state();
        let connection_actions = transition(&mut self.connection)?;
        let after = self.connection.state();

        let mut actions = Vec::with_capacity(connection_actions.len() + 1);
        if before != after {
            actions.push(ClientAction::ConnectionChanged(after));
        }

        for action in connection_actions {
            match action {
                ConnectionAction::Open => {
                    actions.push(ClientAction::OpenTransport { url: self.url.clone() });
                },
                ConnectionAction::Send(packet) => actions.push(ClientAction::Send(packet)),
                ConnectionAction::Close { reason } => {
                    tracing::debug!(%reason, "closing transport");
                    actions.push(ClientAction::CloseTransport);
                },
                ConnectionAction::Established => {
                    let message = if self.was_connected {
                        "Connection restored"
                    } else {
                        "Connected to server"
                    };
                    self.was_connected = true;
                    actions.push(ClientAction::Notify {
                        level: NotificationLevel::Success,
                        message: message.to_string(),
                    });
                },
                ConnectionAction::Lost { reason } => {
                    actions.extend(self.on_lost(before, &reason));
                },
            }
        }

        Ok(actions)
    }

    /// The backend drops a generation with the socket that requested it.
    fn abandon_generation(&mut self, actions: &mut Vec<ClientAction>) {
        if self.generation.phase == GenerationPhase::Active {
            self.finalize_target(actions);
            actions.push(ClientAction::SetLoading(false));
            self.generation.phase = GenerationPhase::Finished;
        }
    }

    fn on_lost(&mut self, before: ConnectionState, reason: &str) -> Vec<ClientAction> {
        let mut actions = Vec::with_capacity(3);
        self.abandon_generation(&mut actions);

        let (level, message) = if before == ConnectionState::Connected {
            (NotificationLevel::Warning, format!("Connection lost: {reason}"))
        } else {
            (NotificationLevel::Error, format!("Connection error: {reason}"))
        };
        actions.push(ClientAction::Notify { level, message });
        actions
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
    use memoai_proto::OpenHandshake;
    use serde_json::json;

    use super::*;

    #[derive(Clone)]
    struct TestEnv {
        start: Instant,
        seed: Arc<AtomicU8>,
    }

    impl TestEnv {
        fn new() -> Self {
            Self { start: Instant::now(), seed: Arc::new(AtomicU8::new(1)) }
        }
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
            // Distinct per call so generated ids never collide
            let seed = self.seed.fetch_add(1, Ordering::Relaxed);
            buffer.fill(seed);
        }
    }

    fn connected_client() -> Client<TestEnv> {
        let mut client = Client::new(TestEnv::new(), ClientConfig::default());
        client.handle(ClientEvent::Start).unwrap();
        client.handle(ClientEvent::TransportOpened).unwrap();
        client
            .handle(ClientEvent::PacketReceived(Packet::Open(OpenHandshake {
                sid: "s1".into(),
                upgrades: vec![],
                ping_interval: 25_000,
                ping_timeout: 120_000,
                max_payload: 1_000_000,
            })))
            .unwrap();
        client.handle(ClientEvent::PacketReceived(Packet::connect())).unwrap();
        client
    }

    fn inbound(name: &str, data: serde_json::Value) -> ClientEvent<Instant> {
        ClientEvent::PacketReceived(Packet::event(name, data))
    }

    #[test]
    fn start_opens_transport() {
        let mut client = Client::new(TestEnv::new(), ClientConfig::default());

        let actions = client.handle(ClientEvent::Start).unwrap();
        assert_eq!(actions, vec![
            ClientAction::ConnectionChanged(ConnectionState::Connecting),
            ClientAction::OpenTransport {
                url: "ws://localhost:8000/socket.io/?EIO=4&transport=websocket".into()
            },
        ]);
    }

    #[test]
    fn handshake_establishes_connection() {
        let client = connected_client();
        assert!(client.is_connected());
    }

    #[test]
    fn chunk_without_target_creates_streaming_message() {
        let mut client = connected_client();

        let actions = client.handle(inbound("chat_chunk", json!({"chunk": "Hel"}))).unwrap();

        let [ClientAction::Store(StoreAction::AddMessage { message })] = actions.as_slice() else {
            panic!("expected a single AddMessage, got {actions:?}");
        };
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.content, "Hel");
        assert!(message.streaming);
        assert_eq!(client.streaming_target(), Some(message.id));
    }

    #[test]
    fn accumulated_only_chunk_replaces_content() {
        let mut client = connected_client();
        client.handle(inbound("chat_chunk", json!({"chunk": "Hel"}))).unwrap();
        let target = client.streaming_target().unwrap();

        let actions =
            client.handle(inbound("chat_chunk", json!({"accumulated": "Hello"}))).unwrap();
        assert_eq!(actions, vec![ClientAction::Store(StoreAction::UpdateMessage {
            id: target,
            content: Some("Hello".into()),
            streaming: Some(true),
        })]);
    }

    #[test]
    fn complete_without_target_adds_final_message() {
        let mut client = connected_client();

        let actions = client
            .handle(inbound(
                "chat_complete",
                json!({"response": "Done", "timestamp": "2024-05-01T10:00:00.250000"}),
            ))
            .unwrap();

        let [
            ClientAction::Store(StoreAction::AddMessage { message }),
            ClientAction::SetLoading(false),
        ] = actions.as_slice()
        else {
            panic!("unexpected actions {actions:?}");
        };
        assert!(!message.streaming);
        assert_eq!(message.timestamp.to_rfc3339(), "2024-05-01T10:00:00.250+00:00");
    }

    #[test]
    fn error_finalizes_target() {
        let mut client = connected_client();
        client.handle(inbound("chat_chunk", json!({"chunk": "par"}))).unwrap();
        let target = client.streaming_target().unwrap();

        let actions = client.handle(inbound("chat_error", json!({"error": "boom"}))).unwrap();

        assert_eq!(actions, vec![
            ClientAction::Notify {
                level: NotificationLevel::Error,
                message: "Server error: boom".into(),
            },
            ClientAction::SetLoading(false),
            ClientAction::Store(StoreAction::UpdateMessage {
                id: target,
                content: None,
                streaming: Some(false),
            }),
        ]);
        assert_eq!(client.streaming_target(), None);
    }

    #[test]
    fn late_events_after_local_stop_are_dropped() {
        let mut client = connected_client();
        client.handle(ClientEvent::SendMessage { text: "Hi".into(), streaming: true }).unwrap();
        client.handle(inbound("chat_chunk", json!({"chunk": "Hel"}))).unwrap();
        client.handle(ClientEvent::StopGeneration).unwrap();

        assert!(client.handle(inbound("chat_chunk", json!({"chunk": "lo"}))).unwrap().is_empty());
        let complete = inbound("chat_complete", json!({"response": "Hello"}));
        assert!(client.handle(complete).unwrap().is_empty());
        assert_eq!(client.generation().phase, GenerationPhase::Stopped);

        let actions = client.handle(inbound("generation_stopped", json!({}))).unwrap();
        assert_eq!(actions, vec![ClientAction::SetLoading(false)]);
        assert_eq!(client.generation().phase, GenerationPhase::Finished);
    }

    #[test]
    fn cleared_target_is_replaced_by_next_chunk() {
        let mut client = connected_client();
        client.handle(ClientEvent::SendMessage { text: "Hi".into(), streaming: true }).unwrap();
        client.handle(inbound("chat_chunk", json!({"chunk": "Hel"}))).unwrap();
        let old = client.streaming_target().unwrap();

        assert!(client.handle(ClientEvent::MessagesCleared).unwrap().is_empty());
        assert_eq!(client.streaming_target(), None);
        assert_eq!(client.generation().phase, GenerationPhase::Active);

        let actions = client.handle(inbound("chat_chunk", json!({"chunk": "lo"}))).unwrap();
        let [ClientAction::Store(StoreAction::AddMessage { message })] = actions.as_slice() else {
            panic!("expected a fresh AddMessage, got {actions:?}");
        };
        assert_ne!(message.id, old);
        assert_eq!(client.streaming_target(), Some(message.id));
    }

    #[test]
    fn connected_and_pong_events_are_ignored() {
        let mut client = connected_client();

        let actions = client
            .handle(inbound("connected", json!({"data": "Connected to MemoAI"})))
            .unwrap();
        assert!(actions.is_empty());
    }

    #[test]
    fn losing_connection_mid_stream_settles_state() {
        let mut client = connected_client();
        client.handle(ClientEvent::SendMessage { text: "Hi".into(), streaming: true }).unwrap();
        client.handle(inbound("chat_chunk", json!({"chunk": "Hel"}))).unwrap();
        let target = client.streaming_target().unwrap();

        let actions =
            client.handle(ClientEvent::TransportClosed { reason: "reset".into() }).unwrap();

        assert_eq!(actions, vec![
            ClientAction::ConnectionChanged(ConnectionState::Disconnected),
            ClientAction::Store(StoreAction::UpdateMessage {
                id: target,
                content: None,
                streaming: Some(false),
            }),
            ClientAction::SetLoading(false),
            ClientAction::Notify {
                level: NotificationLevel::Warning,
                message: "Connection lost: reset".into(),
            },
        ]);
    }

    #[test]
    fn failed_attempt_is_connection_error() {
        let mut client = Client::new(TestEnv::new(), ClientConfig::default());
        client.handle(ClientEvent::Start).unwrap();

        let actions =
            client.handle(ClientEvent::TransportFailed { reason: "refused".into() }).unwrap();
        assert_eq!(actions[1], ClientAction::Notify {
            level: NotificationLevel::Error,
            message: "Connection error: refused".into(),
        });
    }

    #[test]
    fn manual_reconnect_mid_stream_settles_state() {
        let mut client = connected_client();
        client.handle(ClientEvent::SendMessage { text: "Hi".into(), streaming: true }).unwrap();
        client.handle(inbound("chat_chunk", json!({"chunk": "Hel"}))).unwrap();
        let target = client.streaming_target().unwrap();

        let actions = client.handle(ClientEvent::Reconnect).unwrap();

        assert_eq!(actions, vec![
            ClientAction::ConnectionChanged(ConnectionState::Disconnected),
            ClientAction::CloseTransport,
            ClientAction::Store(StoreAction::UpdateMessage {
                id: target,
                content: None,
                streaming: Some(false),
            }),
            ClientAction::SetLoading(false),
        ]);
        assert_eq!(client.generation().phase, GenerationPhase::Finished);
    }
}
