//! Chat messages.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::env::Environment;

/// Opaque message identifier.
///
/// Assigned once at creation and stable for the message's lifetime. Rendered
/// as 32 lowercase hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(u128);

impl MessageId {
    /// Wrap a raw id.
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Draw a fresh id from the environment's randomness.
    pub fn generate<E: Environment>(env: &E) -> Self {
        Self(env.random_u128())
    }

    /// Raw id value.
    pub const fn as_raw(self) -> u128 {
        self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for MessageId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u128::from_str_radix(s, 16).map(Self)
    }
}

impl Serialize for MessageId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person using the client.
    User,
    /// The AI assistant.
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => f.write_str("user"),
            Self::Assistant => f.write_str("assistant"),
        }
    }
}

/// A single entry in the chat log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique id.
    pub id: MessageId,
    /// Author.
    pub role: Role,
    /// Text body. Grows by chunk append or is replaced on finalization.
    pub content: String,
    /// Creation time. Never changes.
    pub timestamp: DateTime<Utc>,
    /// `true` while the assistant's answer is still arriving.
    pub streaming: bool,
}

impl Message {
    /// Create a finished message.
    pub fn new(
        id: MessageId,
        role: Role,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self { id, role, content: content.into(), timestamp, streaming: false }
    }

    /// Mark the message as still streaming.
    #[must_use]
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }
}
