//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use std::collections::HashSet;

use super::{Invariant, InvariantResult, SystemSnapshot, Violation};

/// At most one message streams at a time.
///
/// The client routes every chunk to a single target; a second streaming
/// message means a target was abandoned without being finalized.
pub struct SingleActiveStream;

impl Invariant for SingleActiveStream {
    fn name(&self) -> &'static str {
        "single_active_stream"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let streaming: Vec<_> =
            state.messages.iter().filter(|m| m.streaming).map(|m| m.id).collect();
        if streaming.len() > 1 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("{} messages streaming: {streaming:?}", streaming.len()),
            });
        }
        Ok(())
    }
}

/// Message ids are unique within the log.
pub struct UniqueMessageIds;

impl Invariant for UniqueMessageIds {
    fn name(&self) -> &'static str {
        "unique_message_ids"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let mut seen = HashSet::with_capacity(state.messages.len());
        for message in &state.messages {
            if !seen.insert(message.id) {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("duplicate id {}", message.id),
                });
            }
        }
        Ok(())
    }
}

/// Statistics agree with the log.
///
/// The message count always equals the log length, and an empty log has no
/// tokens. The token total is an incremental estimate (chunk separators are
/// not counted) so it is only checked against the log when empty.
pub struct TokenAccounting;

impl Invariant for TokenAccounting {
    fn name(&self) -> &'static str {
        "token_accounting"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.total_messages != state.messages.len() {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "total_messages {} but log holds {}",
                    state.total_messages,
                    state.messages.len()
                ),
            });
        }
        if state.messages.is_empty() && state.total_tokens != 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!("empty log with {} tokens", state.total_tokens),
            });
        }
        Ok(())
    }
}

/// Notification ids strictly increase.
pub struct NotificationOrder;

impl Invariant for NotificationOrder {
    fn name(&self) -> &'static str {
        "notification_order"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for window in state.notification_ids.windows(2) {
            if window[1] <= window[0] {
                return Err(Violation {
                    invariant: self.name(),
                    message: format!("notification id {} after {}", window[1], window[0]),
                });
            }
        }
        Ok(())
    }
}

/// Nothing is pending once the backend has gone quiet.
///
/// Only meaningful at quiescence: loading is off and no message streams.
/// Not part of [`super::InvariantRegistry::standard`].
pub struct LoadingSettled;

impl Invariant for LoadingSettled {
    fn name(&self) -> &'static str {
        "loading_settled"
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        if state.loading || state.streaming_count() > 0 {
            return Err(Violation {
                invariant: self.name(),
                message: format!(
                    "loading={} with {} streaming messages at quiescence",
                    state.loading,
                    state.streaming_count()
                ),
            });
        }
        Ok(())
    }
}
