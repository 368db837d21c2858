//! Chat event payloads.
//!
//! Outbound events are produced by the client; inbound events are emitted by
//! the backend while it generates an answer. Every inbound event maps to one
//! [`InboundEvent`] variant. Unknown event names are preserved as
//! [`InboundEvent::Other`] so the caller decides whether to log or ignore
//! them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Packet, ProtocolError, Result, parse_timestamp, timestamp::serde_millis};

/// Outbound: user message.
pub const CHAT_MESSAGE: &str = "chat_message";
/// Outbound: stop the current generation.
pub const STOP_GENERATION: &str = "stop_generation";
/// Inbound: partial answer.
pub const CHAT_CHUNK: &str = "chat_chunk";
/// Inbound: final answer.
pub const CHAT_COMPLETE: &str = "chat_complete";
/// Inbound: generation failed.
pub const CHAT_ERROR: &str = "chat_error";
/// Inbound: generation stopped on request.
pub const GENERATION_STOPPED: &str = "generation_stopped";

/// `chat_message` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// User text.
    pub message: String,
    /// Whether the answer should be streamed in chunks.
    pub streaming: bool,
    /// Client send time.
    #[serde(with = "serde_millis")]
    pub timestamp: DateTime<Utc>,
}

/// `stop_generation` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopGeneration {
    /// Client request time.
    #[serde(with = "serde_millis")]
    pub timestamp: DateTime<Utc>,
}

/// Events sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundEvent {
    /// Send a user message.
    ChatMessage(ChatMessage),
    /// Stop the answer currently being generated.
    StopGeneration(StopGeneration),
}

impl OutboundEvent {
    /// Event name on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ChatMessage(_) => CHAT_MESSAGE,
            Self::StopGeneration(_) => STOP_GENERATION,
        }
    }

    /// Wrap in a Socket.IO event packet on the default namespace.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` if the payload cannot be serialized.
    pub fn into_packet(self) -> Result<Packet> {
        let name = self.name();
        let value = match &self {
            Self::ChatMessage(payload) => serde_json::to_value(payload),
            Self::StopGeneration(payload) => serde_json::to_value(payload),
        }
        .map_err(|e| ProtocolError::malformed("outbound event", e))?;

        Ok(Packet::event(name, value))
    }
}

/// `chat_chunk` payload.
///
/// The backend sends both the new fragment and the text accumulated so far;
/// either may be absent on older servers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    /// New fragment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk: Option<String>,
    /// Full answer so far.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accumulated: Option<String>,
}

/// `chat_complete` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatComplete {
    /// Final answer text.
    #[serde(default)]
    pub response: String,
    /// Server completion time, as sent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatComplete {
    /// Completion time, if present and parseable.
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }
}

/// `chat_error` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatError {
    /// Error description from the backend.
    #[serde(default)]
    pub error: String,
}

/// `generation_stopped` payload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationStopped {
    /// Optional server note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Events received from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundEvent {
    /// Partial answer.
    Chunk(ChatChunk),
    /// Final answer.
    Complete(ChatComplete),
    /// Generation failed.
    Error(ChatError),
    /// Generation stopped.
    Stopped(GenerationStopped),
    /// Any other event (`connected`, `pong`, ...).
    Other {
        /// Event name.
        name: String,
        /// Event arguments.
        args: Vec<Value>,
    },
}

impl InboundEvent {
    /// Interpret an event packet. `None` for non-event packets.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` if a known event carries a payload
    /// of the wrong shape.
    pub fn from_packet(packet: &Packet) -> Result<Option<Self>> {
        let Packet::Event { name, args, .. } = packet else {
            return Ok(None);
        };
        Self::from_parts(name, args).map(Some)
    }

    /// Interpret an event by name and arguments.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` if a known event carries a payload
    /// of the wrong shape.
    pub fn from_parts(name: &str, args: &[Value]) -> Result<Self> {
        let first = args.first();
        match name {
            CHAT_CHUNK => decode_payload(first, "chat_chunk").map(Self::Chunk),
            CHAT_COMPLETE => decode_payload(first, "chat_complete").map(Self::Complete),
            CHAT_ERROR => decode_payload(first, "chat_error").map(Self::Error),
            GENERATION_STOPPED => decode_payload(first, "generation_stopped").map(Self::Stopped),
            _ => Ok(Self::Other { name: name.to_string(), args: args.to_vec() }),
        }
    }

    /// Short discriminator, as used in logs (`chunk`, `complete`, ...).
    pub fn kind(&self) -> &str {
        match self {
            Self::Chunk(_) => "chunk",
            Self::Complete(_) => "complete",
            Self::Error(_) => "error",
            Self::Stopped(_) => "stopped",
            Self::Other { name, .. } => name.as_str(),
        }
    }
}

/// Decode an event argument, treating a missing argument as an empty object.
fn decode_payload<T: DeserializeOwned + Default>(
    value: Option<&Value>,
    context: &'static str,
) -> Result<T> {
    match value {
        None | Some(Value::Null) => Ok(T::default()),
        Some(value) => {
            T::deserialize(value).map_err(|e| ProtocolError::malformed(context, e))
        },
    }
}
