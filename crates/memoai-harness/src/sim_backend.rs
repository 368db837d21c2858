//! Scripted MemoAI backend speaking the wire protocol.
//!
//! `SimBackend` plays the server side of one Socket.IO session at the packet
//! level: it sends the Engine.IO handshake when a transport opens, accepts or
//! refuses the namespace connect, and answers `chat_message` with a scripted
//! reply, streamed word by word or sent whole. Replies are returned in full
//! as soon as the request arrives, so a driver that delivers them slowly
//! exposes the client to the same late events a real backend produces after
//! a stop.

use memoai_proto::{
    DEFAULT_NAMESPACE, OpenHandshake, Packet,
    event::{
        CHAT_CHUNK, CHAT_COMPLETE, CHAT_ERROR, CHAT_MESSAGE, ChatMessage, GENERATION_STOPPED,
        STOP_GENERATION,
    },
    format_timestamp,
};
use serde_json::json;

/// Ping interval announced in the handshake, in milliseconds.
pub const PING_INTERVAL_MS: u64 = 25_000;
/// Pong deadline announced in the handshake, in milliseconds.
pub const PING_TIMEOUT_MS: u64 = 20_000;

/// How the backend answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Answer text for every message.
    pub reply: String,
    /// Refuse the namespace connect with this reason.
    pub refuse_connect: Option<String>,
    /// Answer every message with `chat_error` carrying this text.
    pub fail_with: Option<String>,
    /// Include `accumulated` alongside `chunk` in stream events.
    pub send_accumulated: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            reply: "Hello from MemoAI".to_string(),
            refuse_connect: None,
            fail_with: None,
            send_accumulated: true,
        }
    }
}

/// Where the simulated session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendPhase {
    /// No transport.
    Closed,
    /// Handshake sent, waiting for the namespace connect.
    AwaitingConnect,
    /// Namespace connected; chat traffic is accepted.
    Connected,
}

/// Scripted backend for a single client.
#[derive(Debug, Clone)]
pub struct SimBackend {
    config: BackendConfig,
    phase: BackendPhase,
    sessions: u64,
    received: Vec<String>,
    stops: usize,
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new(BackendConfig::default())
    }
}

impl SimBackend {
    /// Backend with the given script.
    pub fn new(config: BackendConfig) -> Self {
        Self { config, phase: BackendPhase::Closed, sessions: 0, received: Vec::new(), stops: 0 }
    }

    /// Current script.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Change the script; affects the next request.
    pub fn config_mut(&mut self) -> &mut BackendConfig {
        &mut self.config
    }

    /// Session phase.
    pub fn phase(&self) -> BackendPhase {
        self.phase
    }

    /// Number of transports opened so far.
    pub fn sessions(&self) -> u64 {
        self.sessions
    }

    /// Texts of every `chat_message` received, in order.
    pub fn received(&self) -> &[String] {
        &self.received
    }

    /// Number of `stop_generation` requests received.
    pub fn stops(&self) -> usize {
        self.stops
    }

    /// A transport opened: send the Engine.IO handshake.
    pub fn on_open(&mut self) -> Vec<Packet> {
        self.sessions += 1;
        self.phase = BackendPhase::AwaitingConnect;

        vec![Packet::Open(OpenHandshake {
            sid: format!("sim-{}", self.sessions),
            upgrades: Vec::new(),
            ping_interval: PING_INTERVAL_MS,
            ping_timeout: PING_TIMEOUT_MS,
            max_payload: 1_000_000,
        })]
    }

    /// The transport closed.
    pub fn on_close(&mut self) {
        self.phase = BackendPhase::Closed;
    }

    /// Server-initiated ping.
    pub fn ping(&self) -> Option<Packet> {
        (self.phase != BackendPhase::Closed).then_some(Packet::Ping(None))
    }

    /// Handle a packet from the client and return the replies.
    pub fn handle(&mut self, packet: &Packet) -> Vec<Packet> {
        match (self.phase, packet) {
            (BackendPhase::Closed, _) => {
                tracing::debug!(?packet, "backend closed, dropping packet");
                Vec::new()
            },
            (BackendPhase::AwaitingConnect, Packet::Connect { .. }) => self.on_connect(),
            (_, Packet::Close | Packet::Disconnect { .. }) => {
                self.on_close();
                Vec::new()
            },
            (BackendPhase::Connected, Packet::Event { name, args, .. }) => {
                self.on_event(name, args)
            },
            _ => Vec::new(),
        }
    }

    fn on_connect(&mut self) -> Vec<Packet> {
        if let Some(reason) = &self.config.refuse_connect {
            return vec![Packet::ConnectError {
                namespace: DEFAULT_NAMESPACE.to_string(),
                data: json!({ "message": reason }),
            }];
        }

        self.phase = BackendPhase::Connected;
        vec![
            Packet::Connect {
                namespace: DEFAULT_NAMESPACE.to_string(),
                data: Some(json!({ "sid": format!("ns-{}", self.sessions) })),
            },
            Packet::event("connected", json!({ "data": "Connected to MemoAI" })),
        ]
    }

    fn on_event(&mut self, name: &str, args: &[serde_json::Value]) -> Vec<Packet> {
        match name {
            CHAT_MESSAGE => {
                let Some(message) = args
                    .first()
                    .and_then(|value| serde_json::from_value::<ChatMessage>(value.clone()).ok())
                else {
                    return vec![Packet::event(CHAT_ERROR, json!({ "error": "bad request" }))];
                };
                self.reply(message)
            },
            STOP_GENERATION => {
                self.stops += 1;
                vec![Packet::event(GENERATION_STOPPED, json!({ "message": "Generation stopped" }))]
            },
            other => {
                tracing::debug!(name = other, "backend ignoring event");
                Vec::new()
            },
        }
    }

    fn reply(&mut self, message: ChatMessage) -> Vec<Packet> {
        self.received.push(message.message);

        if let Some(error) = &self.config.fail_with {
            return vec![Packet::event(CHAT_ERROR, json!({ "error": error }))];
        }

        let reply = self.config.reply.clone();
        let mut packets = Vec::new();

        if message.streaming {
            let mut accumulated = String::new();
            for word in reply.split_inclusive(' ') {
                accumulated.push_str(word);
                let payload = if self.config.send_accumulated {
                    json!({ "chunk": word, "accumulated": accumulated })
                } else {
                    json!({ "chunk": word })
                };
                packets.push(Packet::event(CHAT_CHUNK, payload));
            }
        }

        packets.push(Packet::event(
            CHAT_COMPLETE,
            json!({ "response": reply, "timestamp": format_timestamp(message.timestamp) }),
        ));
        packets
    }
}
