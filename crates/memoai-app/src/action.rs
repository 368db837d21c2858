//! Application side-effects and intents.
//!
//! This module defines the [`AppAction`] enum, which represents instructions
//! produced by the [`crate::App`] state machine for the runtime to execute.

use crate::prefs::Preferences;

/// Actions produced by the App state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Render the UI.
    Render,

    /// Quit the application.
    Quit,

    /// Send a chat message.
    SendMessage {
        /// Trimmed, non-empty message text.
        text: String,
        /// Ask for a streamed answer.
        streaming: bool,
    },

    /// Stop the answer being generated.
    StopGeneration,

    /// Drop the connection and start over.
    Reconnect,

    /// Pause automatic reconnection.
    SuspendReconnect,

    /// Resume automatic reconnection.
    ResumeReconnect,

    /// The chat log was emptied; the client must forget its streaming target.
    MessagesCleared,

    /// Persist preferences.
    SavePreferences(Preferences),
}
