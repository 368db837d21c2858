//! Application input events.
//!
//! This module defines [`AppEvent`], the set of inputs that drive the
//! [`crate::App`] state machine.
//!
//! Events originate from two distinct sources:
//! - Terminal resizes and system ticks.
//! - Client notifications translated by the [`crate::Bridge`].

use chrono::{DateTime, Utc};
use memoai_client::NotificationLevel;
use memoai_core::{ConnectionState, StoreAction};

/// Events processed by the App state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Periodic tick.
    Tick,

    /// Terminal resize (columns, rows).
    Resize(u16, u16),

    /// Connection state changed.
    ConnectionChanged(ConnectionState),

    /// Apply an action to the message store.
    Store(StoreAction),

    /// Loading indicator changed.
    Loading(bool),

    /// Show a notification.
    Notify {
        /// Severity.
        level: NotificationLevel,
        /// Text.
        message: String,
        /// When it was raised.
        timestamp: DateTime<Utc>,
    },
}
