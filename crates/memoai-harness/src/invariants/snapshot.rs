//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture the observable state of the system at a point in time.
//! Invariants operate on snapshots rather than live state to ensure
//! consistent, atomic checks.

use memoai_app::App;
use memoai_core::{ConnectionState, MessageId, tokens::estimate_tokens};

/// Snapshot of one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSnapshot {
    /// Message id.
    pub id: MessageId,
    /// Still receiving chunks.
    pub streaming: bool,
    /// Token estimate of the current content.
    pub tokens: usize,
}

/// Snapshot of the application state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemSnapshot {
    /// Messages in log order.
    pub messages: Vec<MessageSnapshot>,
    /// Message count reported by the store statistics.
    pub total_messages: usize,
    /// Token total reported by the store statistics.
    pub total_tokens: usize,
    /// Loading indicator.
    pub loading: bool,
    /// Connection state.
    pub connection: ConnectionState,
    /// Notification ids, oldest first.
    pub notification_ids: Vec<u64>,
}

impl Default for SystemSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

impl SystemSnapshot {
    /// Snapshot of a freshly started app.
    pub fn empty() -> Self {
        Self {
            messages: Vec::new(),
            total_messages: 0,
            total_tokens: 0,
            loading: false,
            connection: ConnectionState::Disconnected,
            notification_ids: Vec::new(),
        }
    }

    /// Capture the observable state of `app`.
    pub fn from_app(app: &App) -> Self {
        let store = app.store();
        let stats = store.stats();

        Self {
            messages: store
                .messages()
                .iter()
                .map(|m| MessageSnapshot {
                    id: m.id,
                    streaming: m.streaming,
                    tokens: estimate_tokens(&m.content),
                })
                .collect(),
            total_messages: stats.total_messages,
            total_tokens: stats.total_tokens,
            loading: app.is_loading(),
            connection: app.connection_state(),
            notification_ids: app.notifications().iter().map(|n| n.id).collect(),
        }
    }

    /// Number of messages still streaming.
    pub fn streaming_count(&self) -> usize {
        self.messages.iter().filter(|m| m.streaming).count()
    }
}
