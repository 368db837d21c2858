//! Chat log reducer.
//!
//! [`MessageStore`] is an ordered, append-only log of messages plus running
//! session statistics. It changes only through [`StoreAction`]s. Reduction is
//! deterministic and free of side effects apart from debug logging.
//!
//! # Snapshots
//!
//! Messages are reference counted, so [`MessageStore::reduce`] returns a new
//! snapshot that shares every untouched message with the old one. The old
//! snapshot stays valid and unchanged, which is what lets a renderer hold on
//! to it while the next action is applied.
//!
//! # Unknown ids
//!
//! `UpdateMessage` and `AppendChunk` for an id that is not in the log are
//! ignored rather than rejected. Late events for a cleared session are a
//! normal race, not a bug worth surfacing to the user. The
//! [`ReduceOutcome`] tells the caller which case happened, and every ignored
//! action is logged at debug level.

use std::sync::Arc;

use crate::{
    message::{Message, MessageId},
    smart_join::smart_join,
    tokens::estimate_tokens,
};

/// Actions accepted by [`MessageStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Append a message. The id must be fresh; duplicates are ignored.
    AddMessage {
        /// Message to append
        message: Message,
    },

    /// Replace the provided fields of an existing message.
    UpdateMessage {
        /// Target message
        id: MessageId,
        /// New content, if it changes
        content: Option<String>,
        /// New streaming flag, if it changes
        streaming: Option<bool>,
    },

    /// Smart-join a chunk onto an existing message.
    AppendChunk {
        /// Target message
        id: MessageId,
        /// Text to append
        chunk: String,
        /// New streaming flag, if it changes
        streaming: Option<bool>,
    },

    /// Empty the log and reset statistics.
    ClearMessages,
}

impl StoreAction {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddMessage { .. } => "add_message",
            Self::UpdateMessage { .. } => "update_message",
            Self::AppendChunk { .. } => "append_chunk",
            Self::ClearMessages => "clear_messages",
        }
    }
}

/// Whether an action changed the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// The action was applied.
    Applied,
    /// The action targeted an unknown id or reused an existing one.
    Ignored,
}

/// Running session statistics.
///
/// `total_tokens` is an estimate maintained incrementally. Chunk appends add
/// the estimate of the chunk alone, so after separators are inserted the
/// total can drift from [`MessageStore::recount_tokens`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Number of messages in the log
    pub total_messages: usize,
    /// Estimated tokens across the session
    pub total_tokens: usize,
}

/// Ordered chat log with statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageStore {
    messages: Vec<Arc<Message>>,
    stats: StoreStats,
}

impl MessageStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages in insertion order.
    pub fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    /// Session statistics.
    pub fn stats(&self) -> StoreStats {
        self.stats
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by id.
    pub fn get(&self, id: MessageId) -> Option<&Arc<Message>> {
        self.messages.iter().find(|m| m.id == id)
    }

    /// Whether a message with this id exists.
    pub fn contains(&self, id: MessageId) -> bool {
        self.get(id).is_some()
    }

    /// Messages currently marked as streaming.
    pub fn streaming(&self) -> impl Iterator<Item = &Arc<Message>> {
        self.messages.iter().filter(|m| m.streaming)
    }

    /// Exact token estimate of the current log, ignoring incremental drift.
    pub fn recount_tokens(&self) -> usize {
        self.messages.iter().map(|m| estimate_tokens(&m.content)).sum()
    }

    /// Apply an action to a copy of this store and return the copy.
    #[must_use]
    pub fn reduce(&self, action: StoreAction) -> Self {
        self.reduce_with_outcome(action).0
    }

    /// Like [`reduce`](Self::reduce), also reporting whether the action
    /// applied.
    #[must_use]
    pub fn reduce_with_outcome(&self, action: StoreAction) -> (Self, ReduceOutcome) {
        let mut next = self.clone();
        let outcome = next.apply(action);
        (next, outcome)
    }

    /// Apply an action in place.
    ///
    /// Other snapshots sharing messages with this one are unaffected: a
    /// changed message is replaced, never mutated through the shared pointer.
    pub fn apply(&mut self, action: StoreAction) -> ReduceOutcome {
        let name = action.name();
        let outcome = match action {
            StoreAction::AddMessage { message } => self.add(message),
            StoreAction::UpdateMessage { id, content, streaming } => {
                self.update(id, content, streaming)
            },
            StoreAction::AppendChunk { id, chunk, streaming } => {
                self.append_chunk(id, &chunk, streaming)
            },
            StoreAction::ClearMessages => {
                self.messages.clear();
                self.stats = StoreStats::default();
                ReduceOutcome::Applied
            },
        };

        if outcome == ReduceOutcome::Ignored {
            tracing::debug!(action = name, "store action ignored");
        }
        outcome
    }

    fn add(&mut self, message: Message) -> ReduceOutcome {
        if self.contains(message.id) {
            tracing::debug!(id = %message.id, "duplicate message id");
            return ReduceOutcome::Ignored;
        }

        self.stats.total_messages += 1;
        self.stats.total_tokens += estimate_tokens(&message.content);
        self.messages.push(Arc::new(message));
        ReduceOutcome::Applied
    }

    fn update(
        &mut self,
        id: MessageId,
        content: Option<String>,
        streaming: Option<bool>,
    ) -> ReduceOutcome {
        let Some(slot) = self.position(id) else {
            tracing::debug!(%id, "update for unknown message");
            return ReduceOutcome::Ignored;
        };

        let mut message = Message::clone(&self.messages[slot]);
        if let Some(content) = content {
            let old = estimate_tokens(&message.content);
            let new = estimate_tokens(&content);
            self.stats.total_tokens = self.stats.total_tokens.saturating_sub(old) + new;
            message.content = content;
        }
        if let Some(streaming) = streaming {
            message.streaming = streaming;
        }

        self.messages[slot] = Arc::new(message);
        ReduceOutcome::Applied
    }

    fn append_chunk(
        &mut self,
        id: MessageId,
        chunk: &str,
        streaming: Option<bool>,
    ) -> ReduceOutcome {
        let Some(slot) = self.position(id) else {
            tracing::debug!(%id, "chunk for unknown message");
            return ReduceOutcome::Ignored;
        };

        let mut message = Message::clone(&self.messages[slot]);
        message.content = smart_join(&message.content, chunk);
        if let Some(streaming) = streaming {
            message.streaming = streaming;
        }

        self.stats.total_tokens += estimate_tokens(chunk);
        self.messages[slot] = Arc::new(message);
        ReduceOutcome::Applied
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.messages.iter().position(|m| m.id == id)
    }
}
