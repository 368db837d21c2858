//! Engine.IO / Socket.IO text packet codec.
//!
//! An Engine.IO text frame is a single type digit followed by an optional
//! body. Message frames (`4`) embed a Socket.IO packet:
//!
//! ```text
//! <engine type> [<socket type> [<namespace>,] [<ack id>] [<json>]]
//!      4              2          /admin,        12       ["event",{..}]
//! ```
//!
//! The default namespace `/` is never written on the wire.
//!
//! # Invariants
//!
//! - `Packet::decode(&p.encode()) == Ok(p)` for every packet this module can
//!   construct with a JSON-array event payload.
//! - Binary packets (Socket.IO types `5` and `6`) are rejected, never
//!   partially parsed.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{ProtocolError, Result};

/// Namespace used when the packet does not name one.
pub const DEFAULT_NAMESPACE: &str = "/";

/// Engine.IO packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Handshake sent by the server once the transport is open.
    Open,
    /// Transport close request.
    Close,
    /// Heartbeat probe.
    Ping,
    /// Heartbeat answer.
    Pong,
    /// Carries a Socket.IO packet.
    Message,
    /// Transport upgrade (polling only).
    Upgrade,
    /// No operation.
    Noop,
}

impl EngineKind {
    /// Parse from the leading type digit.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Open),
            '1' => Some(Self::Close),
            '2' => Some(Self::Ping),
            '3' => Some(Self::Pong),
            '4' => Some(Self::Message),
            '5' => Some(Self::Upgrade),
            '6' => Some(Self::Noop),
            _ => None,
        }
    }

    /// Wire digit.
    pub fn to_char(self) -> char {
        match self {
            Self::Open => '0',
            Self::Close => '1',
            Self::Ping => '2',
            Self::Pong => '3',
            Self::Message => '4',
            Self::Upgrade => '5',
            Self::Noop => '6',
        }
    }
}

/// Socket.IO packet types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketKind {
    /// Namespace connect (request from client, ack from server).
    Connect,
    /// Namespace disconnect.
    Disconnect,
    /// Named event.
    Event,
    /// Acknowledgement of an event.
    Ack,
    /// Namespace connection refused.
    ConnectError,
    /// Event with binary attachments.
    BinaryEvent,
    /// Ack with binary attachments.
    BinaryAck,
}

impl SocketKind {
    /// Parse from the type digit following the Engine.IO `4`.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '0' => Some(Self::Connect),
            '1' => Some(Self::Disconnect),
            '2' => Some(Self::Event),
            '3' => Some(Self::Ack),
            '4' => Some(Self::ConnectError),
            '5' => Some(Self::BinaryEvent),
            '6' => Some(Self::BinaryAck),
            _ => None,
        }
    }

    /// Wire digit.
    pub fn to_char(self) -> char {
        match self {
            Self::Connect => '0',
            Self::Disconnect => '1',
            Self::Event => '2',
            Self::Ack => '3',
            Self::ConnectError => '4',
            Self::BinaryEvent => '5',
            Self::BinaryAck => '6',
        }
    }
}

/// Engine.IO handshake carried by the `open` packet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenHandshake {
    /// Engine.IO session id.
    pub sid: String,
    /// Transports the session may upgrade to.
    #[serde(default)]
    pub upgrades: Vec<String>,
    /// Server ping interval in milliseconds.
    pub ping_interval: u64,
    /// Time the server waits for a pong, in milliseconds.
    pub ping_timeout: u64,
    /// Maximum payload size in bytes.
    #[serde(default)]
    pub max_payload: u64,
}

/// A decoded wire packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Engine.IO handshake.
    Open(OpenHandshake),
    /// Engine.IO close.
    Close,
    /// Engine.IO ping. Servers may attach a probe string.
    Ping(Option<String>),
    /// Engine.IO pong.
    Pong(Option<String>),
    /// Engine.IO no-op.
    Noop,
    /// Socket.IO namespace connect.
    Connect {
        /// Namespace, `/` by default.
        namespace: String,
        /// Auth payload (client) or `{ "sid": .. }` (server).
        data: Option<Value>,
    },
    /// Socket.IO namespace disconnect.
    Disconnect {
        /// Namespace, `/` by default.
        namespace: String,
    },
    /// Socket.IO event.
    Event {
        /// Namespace, `/` by default.
        namespace: String,
        /// Acknowledgement id requested by the sender.
        ack_id: Option<u64>,
        /// Event name.
        name: String,
        /// Event arguments following the name.
        args: Vec<Value>,
    },
    /// Socket.IO acknowledgement.
    Ack {
        /// Namespace, `/` by default.
        namespace: String,
        /// Id of the acknowledged event.
        ack_id: u64,
        /// Ack arguments.
        args: Vec<Value>,
    },
    /// Socket.IO namespace connect refused.
    ConnectError {
        /// Namespace, `/` by default.
        namespace: String,
        /// Error payload, usually `{ "message": .. }`.
        data: Value,
    },
}

impl Packet {
    /// Connect request for the default namespace.
    pub fn connect() -> Self {
        Self::Connect { namespace: DEFAULT_NAMESPACE.to_string(), data: None }
    }

    /// Event on the default namespace with a single JSON argument.
    pub fn event(name: impl Into<String>, arg: Value) -> Self {
        Self::Event {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ack_id: None,
            name: name.into(),
            args: vec![arg],
        }
    }

    /// Engine.IO packet type of this packet.
    pub fn engine_kind(&self) -> EngineKind {
        match self {
            Self::Open(_) => EngineKind::Open,
            Self::Close => EngineKind::Close,
            Self::Ping(_) => EngineKind::Ping,
            Self::Pong(_) => EngineKind::Pong,
            Self::Noop => EngineKind::Noop,
            Self::Connect { .. }
            | Self::Disconnect { .. }
            | Self::Event { .. }
            | Self::Ack { .. }
            | Self::ConnectError { .. } => EngineKind::Message,
        }
    }

    /// Socket.IO packet type, if this is a message packet.
    pub fn socket_kind(&self) -> Option<SocketKind> {
        match self {
            Self::Connect { .. } => Some(SocketKind::Connect),
            Self::Disconnect { .. } => Some(SocketKind::Disconnect),
            Self::Event { .. } => Some(SocketKind::Event),
            Self::Ack { .. } => Some(SocketKind::Ack),
            Self::ConnectError { .. } => Some(SocketKind::ConnectError),
            Self::Open(_) | Self::Close | Self::Ping(_) | Self::Pong(_) | Self::Noop => None,
        }
    }

    /// Encode into a WebSocket text frame.
    ///
    /// # Errors
    ///
    /// Returns `ProtocolError::Malformed` if a JSON body cannot be
    /// serialized.
    pub fn encode(&self) -> Result<String> {
        let mut out = String::new();
        out.push(self.engine_kind().to_char());

        match self {
            Self::Open(handshake) => {
                let body = serde_json::to_string(handshake)
                    .map_err(|e| ProtocolError::malformed("open handshake", e))?;
                out.push_str(&body);
            },
            Self::Ping(probe) | Self::Pong(probe) => {
                if let Some(probe) = probe {
                    out.push_str(probe);
                }
            },
            Self::Close | Self::Noop => {},
            Self::Connect { namespace, data } => {
                push_socket_header(&mut out, SocketKind::Connect, namespace, None);
                if let Some(data) = data {
                    push_json(&mut out, data, "connect data")?;
                }
            },
            Self::Disconnect { namespace } => {
                push_socket_header(&mut out, SocketKind::Disconnect, namespace, None);
            },
            Self::Event { namespace, ack_id, name, args } => {
                push_socket_header(&mut out, SocketKind::Event, namespace, *ack_id);
                let mut array = Vec::with_capacity(args.len() + 1);
                array.push(Value::String(name.clone()));
                array.extend(args.iter().cloned());
                push_json(&mut out, &Value::Array(array), "event")?;
            },
            Self::Ack { namespace, ack_id, args } => {
                push_socket_header(&mut out, SocketKind::Ack, namespace, Some(*ack_id));
                push_json(&mut out, &Value::Array(args.clone()), "ack")?;
            },
            Self::ConnectError { namespace, data } => {
                push_socket_header(&mut out, SocketKind::ConnectError, namespace, None);
                push_json(&mut out, data, "connect_error")?;
            },
        }

        Ok(out)
    }

    /// Decode a WebSocket text frame.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Empty` for an empty frame
    /// - `ProtocolError::UnknownEngineType` / `UnknownSocketType` for bad type
    ///   digits
    /// - `ProtocolError::Unsupported` for upgrade and binary packets
    /// - `ProtocolError::Malformed` for invalid bodies
    pub fn decode(text: &str) -> Result<Self> {
        let mut chars = text.chars();
        let first = chars.next().ok_or(ProtocolError::Empty)?;
        let kind = EngineKind::from_char(first).ok_or(ProtocolError::UnknownEngineType(first))?;
        let body = chars.as_str();

        match kind {
            EngineKind::Open => {
                let handshake = serde_json::from_str(body)
                    .map_err(|e| ProtocolError::malformed("open handshake", e))?;
                Ok(Self::Open(handshake))
            },
            EngineKind::Close => Ok(Self::Close),
            EngineKind::Ping => Ok(Self::Ping(non_empty(body))),
            EngineKind::Pong => Ok(Self::Pong(non_empty(body))),
            EngineKind::Noop => Ok(Self::Noop),
            EngineKind::Upgrade => Err(ProtocolError::Unsupported("engine.io upgrade")),
            EngineKind::Message => decode_socket(body),
        }
    }
}

fn non_empty(body: &str) -> Option<String> {
    if body.is_empty() { None } else { Some(body.to_string()) }
}

fn push_socket_header(out: &mut String, kind: SocketKind, namespace: &str, ack_id: Option<u64>) {
    out.push(kind.to_char());
    if namespace != DEFAULT_NAMESPACE {
        out.push_str(namespace);
        out.push(',');
    }
    if let Some(id) = ack_id {
        out.push_str(&id.to_string());
    }
}

fn push_json(out: &mut String, value: &Value, context: &'static str) -> Result<()> {
    let body = serde_json::to_string(value).map_err(|e| ProtocolError::malformed(context, e))?;
    out.push_str(&body);
    Ok(())
}

fn decode_socket(body: &str) -> Result<Packet> {
    let mut chars = body.chars();
    let first = chars.next().ok_or(ProtocolError::Unsupported("empty engine.io message"))?;
    let kind = SocketKind::from_char(first).ok_or(ProtocolError::UnknownSocketType(first))?;
    if matches!(kind, SocketKind::BinaryEvent | SocketKind::BinaryAck) {
        return Err(ProtocolError::Unsupported("binary attachments"));
    }

    let rest = chars.as_str();
    let (namespace, rest) = split_namespace(rest);
    let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
    let (ack_digits, json) = rest.split_at(digits);
    let ack_id = if ack_digits.is_empty() {
        None
    } else {
        Some(
            ack_digits
                .parse::<u64>()
                .map_err(|e| ProtocolError::malformed("ack id", e))?,
        )
    };
    let data = if json.is_empty() {
        None
    } else {
        Some(
            serde_json::from_str::<Value>(json)
                .map_err(|e| ProtocolError::malformed("socket.io body", e))?,
        )
    };

    match kind {
        SocketKind::Connect => Ok(Packet::Connect { namespace, data }),
        SocketKind::Disconnect => Ok(Packet::Disconnect { namespace }),
        SocketKind::ConnectError => {
            Ok(Packet::ConnectError { namespace, data: data.unwrap_or(Value::Null) })
        },
        SocketKind::Event => {
            let Some(Value::Array(mut items)) = data else {
                return Err(ProtocolError::malformed("event", "payload is not a JSON array"));
            };
            if items.is_empty() {
                return Err(ProtocolError::malformed("event", "missing event name"));
            }
            let Value::String(name) = items.remove(0) else {
                return Err(ProtocolError::malformed("event", "event name is not a string"));
            };
            Ok(Packet::Event { namespace, ack_id, name, args: items })
        },
        SocketKind::Ack => {
            let Some(ack_id) = ack_id else {
                return Err(ProtocolError::malformed("ack", "missing ack id"));
            };
            let args = match data {
                Some(Value::Array(items)) => items,
                None => Vec::new(),
                Some(_) => {
                    return Err(ProtocolError::malformed("ack", "payload is not a JSON array"));
                },
            };
            Ok(Packet::Ack { namespace, ack_id, args })
        },
        SocketKind::BinaryEvent | SocketKind::BinaryAck => {
            Err(ProtocolError::Unsupported("binary attachments"))
        },
    }
}

/// Split a leading `/namespace,` off the packet body.
///
/// A namespace without a trailing comma runs to the end of the body (used by
/// bare connect/disconnect packets such as `1/admin`).
fn split_namespace(rest: &str) -> (String, &str) {
    if !rest.starts_with('/') {
        return (DEFAULT_NAMESPACE.to_string(), rest);
    }
    match rest.find(',') {
        Some(idx) => (rest[..idx].to_string(), &rest[idx + 1..]),
        None => (rest.to_string(), ""),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decode_open_handshake() {
        let text = r#"0{"sid":"abc","upgrades":[],"pingInterval":25000,"pingTimeout":120000,"maxPayload":1000000}"#;
        let packet = Packet::decode(text).unwrap();

        assert_eq!(
            packet,
            Packet::Open(OpenHandshake {
                sid: "abc".into(),
                upgrades: vec![],
                ping_interval: 25_000,
                ping_timeout: 120_000,
                max_payload: 1_000_000,
            })
        );
    }

    #[test]
    fn decode_heartbeats() {
        assert_eq!(Packet::decode("2").unwrap(), Packet::Ping(None));
        assert_eq!(Packet::decode("3probe").unwrap(), Packet::Pong(Some("probe".into())));
    }

    #[test]
    fn decode_connect_ack_with_sid() {
        let packet = Packet::decode(r#"40{"sid":"xyz"}"#).unwrap();
        assert_eq!(packet, Packet::Connect {
            namespace: "/".into(),
            data: Some(json!({"sid": "xyz"})),
        });
    }

    #[test]
    fn decode_event_with_namespace_and_ack() {
        let packet = Packet::decode(r#"42/admin,7["chat_chunk",{"chunk":"a"}]"#).unwrap();
        assert_eq!(packet, Packet::Event {
            namespace: "/admin".into(),
            ack_id: Some(7),
            name: "chat_chunk".into(),
            args: vec![json!({"chunk": "a"})],
        });
    }

    #[test]
    fn decode_bare_namespace_disconnect() {
        assert_eq!(Packet::decode("41/admin").unwrap(), Packet::Disconnect {
            namespace: "/admin".into()
        });
    }

    #[test]
    fn encode_connect_omits_default_namespace() {
        assert_eq!(Packet::connect().encode().unwrap(), "40");
    }

    #[test]
    fn encode_event_prepends_name() {
        let packet = Packet::event("stop_generation", json!({"timestamp": "t"}));
        assert_eq!(packet.encode().unwrap(), r#"42["stop_generation",{"timestamp":"t"}]"#);
    }

    #[test]
    fn rejects_binary_and_garbage() {
        assert_eq!(Packet::decode(""), Err(ProtocolError::Empty));
        assert_eq!(Packet::decode("9"), Err(ProtocolError::UnknownEngineType('9')));
        assert_eq!(Packet::decode("47"), Err(ProtocolError::UnknownSocketType('7')));
        assert!(matches!(Packet::decode("451-[\"x\"]"), Err(ProtocolError::Unsupported(_))));
        assert!(matches!(Packet::decode("42{\"a\":1}"), Err(ProtocolError::Malformed { .. })));
        assert!(matches!(Packet::decode("42[1]"), Err(ProtocolError::Malformed { .. })));
        assert!(matches!(Packet::decode("0not-json"), Err(ProtocolError::Malformed { .. })));
    }
}
