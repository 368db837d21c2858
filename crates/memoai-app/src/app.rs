//! Application state machine.
//!
//! This module defines the [`App`] state machine, which holds everything the
//! UI renders, completely decoupled from I/O and protocol mechanics.
//!
//! This is a pure state machine: it consumes [`crate::AppEvent`] inputs and
//! produces [`crate::AppAction`] instructions for the runtime to execute.
//!
//! # Responsibilities
//!
//! - Owns the [`MessageStore`] and applies the store actions the client
//!   decides on.
//! - Tracks the loading indicator and connection state for UI feedback.
//! - Keeps the settings slices and the notification list.
//! - Emits [`AppAction::SavePreferences`] whenever a persisted setting
//!   changes.

use chrono::{DateTime, Utc};
use memoai_client::NotificationLevel;
use memoai_core::{ConnectionState, MessageStore, StoreAction};

use crate::{
    AppAction, AppEvent,
    prefs::Preferences,
    state::{
        ModelInfo, ModelSettings, Notification, SessionStats, TranscriptionSettings,
        VoiceSettings,
    },
};

/// Oldest notifications are dropped beyond this many.
pub const MAX_NOTIFICATIONS: usize = 50;

/// Application state machine.
///
/// Pure state machine that processes events and produces actions.
/// No I/O dependencies, fully testable in simulation.
#[derive(Debug, Clone)]
pub struct App {
    /// Chat log.
    store: MessageStore,
    /// An answer is pending.
    loading: bool,
    /// Connection state, as last reported by the client.
    connection: ConnectionState,
    /// Model loaded on the backend. `None` until reported.
    current_model: Option<ModelInfo>,
    /// Generation parameters.
    model_settings: ModelSettings,
    /// Models the backend can load.
    available_models: Vec<ModelInfo>,
    /// Microphone capture in progress.
    recording: bool,
    /// Speech playback in progress.
    speaking: bool,
    /// Speech synthesis settings. Persisted.
    voice_settings: VoiceSettings,
    /// Speech recognition settings.
    transcription_settings: TranscriptionSettings,
    /// Name of the document loaded for questions. `None` if none.
    loaded_document: Option<String>,
    /// Dark colour scheme. Persisted.
    dark_mode: bool,
    /// Visible notifications, oldest first.
    notifications: Vec<Notification>,
    /// Id for the next notification.
    next_notification_id: u64,
    /// Sessions started today, as reported by the backend.
    sessions_today: u32,
    /// Terminal dimensions (columns, rows).
    terminal_size: (u16, u16),
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    /// Create an App with an empty log and default settings.
    pub fn new() -> Self {
        Self {
            store: MessageStore::new(),
            loading: false,
            connection: ConnectionState::Disconnected,
            current_model: None,
            model_settings: ModelSettings::default(),
            available_models: Vec::new(),
            recording: false,
            speaking: false,
            voice_settings: VoiceSettings::default(),
            transcription_settings: TranscriptionSettings::default(),
            loaded_document: None,
            dark_mode: false,
            notifications: Vec::new(),
            next_notification_id: 1,
            sessions_today: 0,
            terminal_size: (80, 24),
        }
    }

    /// Process an event and return actions.
    pub fn handle(&mut self, event: AppEvent) -> Vec<AppAction> {
        match event {
            AppEvent::Tick => vec![],
            AppEvent::Resize(cols, rows) => {
                self.terminal_size = (cols, rows);
                vec![AppAction::Render]
            },
            AppEvent::ConnectionChanged(state) => {
                self.connection = state;
                vec![AppAction::Render]
            },
            AppEvent::Store(action) => {
                self.store.apply(action);
                vec![AppAction::Render]
            },
            AppEvent::Loading(loading) => {
                self.loading = loading;
                vec![AppAction::Render]
            },
            AppEvent::Notify { level, message, timestamp } => {
                self.add_notification(level, message, timestamp)
            },
        }
    }

    /// Send a chat message.
    ///
    /// Blank text and sends while an answer is pending are ignored. Whether
    /// the answer streams follows [`ModelSettings::streaming`].
    pub fn send_message(&self, text: &str) -> Vec<AppAction> {
        let text = text.trim();
        if text.is_empty() || self.loading {
            return vec![];
        }

        vec![
            AppAction::SendMessage {
                text: text.to_string(),
                streaming: self.model_settings.streaming,
            },
            AppAction::Render,
        ]
    }

    /// Stop the answer being generated.
    pub fn stop_generation(&self) -> Vec<AppAction> {
        vec![AppAction::StopGeneration, AppAction::Render]
    }

    /// Drop the connection and start over.
    pub fn reconnect(&self) -> Vec<AppAction> {
        vec![AppAction::Reconnect, AppAction::Render]
    }

    /// Pause or resume automatic reconnection.
    pub fn set_auto_reconnect(&self, enabled: bool) -> Vec<AppAction> {
        let action =
            if enabled { AppAction::ResumeReconnect } else { AppAction::SuspendReconnect };
        vec![action]
    }

    /// Empty the chat log. Settings and notifications are kept.
    ///
    /// An answer still streaming carries on into a new message.
    pub fn clear_messages(&mut self) -> Vec<AppAction> {
        self.store.apply(StoreAction::ClearMessages);
        vec![AppAction::MessagesCleared, AppAction::Render]
    }

    /// Set the model reported as loaded.
    pub fn set_current_model(&mut self, model: Option<ModelInfo>) -> Vec<AppAction> {
        self.current_model = model;
        vec![AppAction::Render]
    }

    /// Replace the generation parameters.
    pub fn set_model_settings(&mut self, settings: ModelSettings) -> Vec<AppAction> {
        self.model_settings = settings;
        vec![AppAction::Render]
    }

    /// Replace the list of loadable models.
    pub fn set_available_models(&mut self, models: Vec<ModelInfo>) -> Vec<AppAction> {
        self.available_models = models;
        vec![AppAction::Render]
    }

    /// Set the recording flag.
    pub fn set_recording(&mut self, recording: bool) -> Vec<AppAction> {
        self.recording = recording;
        vec![AppAction::Render]
    }

    /// Set the speaking flag.
    pub fn set_speaking(&mut self, speaking: bool) -> Vec<AppAction> {
        self.speaking = speaking;
        vec![AppAction::Render]
    }

    /// Replace the voice settings and persist them.
    pub fn set_voice_settings(&mut self, settings: VoiceSettings) -> Vec<AppAction> {
        if self.voice_settings == settings {
            return vec![];
        }
        self.voice_settings = settings;
        vec![AppAction::SavePreferences(self.preferences()), AppAction::Render]
    }

    /// Replace the transcription settings.
    pub fn set_transcription_settings(
        &mut self,
        settings: TranscriptionSettings,
    ) -> Vec<AppAction> {
        self.transcription_settings = settings;
        vec![AppAction::Render]
    }

    /// Set or clear the loaded document.
    pub fn set_loaded_document(&mut self, document: Option<String>) -> Vec<AppAction> {
        self.loaded_document = document;
        vec![AppAction::Render]
    }

    /// Record the backend's session count.
    pub fn update_stats(&mut self, sessions_today: u32) -> Vec<AppAction> {
        self.sessions_today = sessions_today;
        vec![AppAction::Render]
    }

    /// Flip the colour scheme and persist it.
    pub fn toggle_dark_mode(&mut self) -> Vec<AppAction> {
        self.dark_mode = !self.dark_mode;
        vec![AppAction::SavePreferences(self.preferences()), AppAction::Render]
    }

    /// Show a notification.
    pub fn add_notification(
        &mut self,
        level: NotificationLevel,
        message: String,
        timestamp: DateTime<Utc>,
    ) -> Vec<AppAction> {
        let id = self.next_notification_id;
        self.next_notification_id += 1;
        self.notifications.push(Notification { id, level, message, timestamp });

        if self.notifications.len() > MAX_NOTIFICATIONS {
            let excess = self.notifications.len() - MAX_NOTIFICATIONS;
            self.notifications.drain(..excess);
        }
        vec![AppAction::Render]
    }

    /// Dismiss a notification. Unknown ids are ignored.
    pub fn remove_notification(&mut self, id: u64) -> Vec<AppAction> {
        let before = self.notifications.len();
        self.notifications.retain(|n| n.id != id);
        if self.notifications.len() == before {
            return vec![];
        }
        vec![AppAction::Render]
    }

    /// Restore persisted settings. Nothing is saved back.
    pub fn apply_preferences(&mut self, prefs: Preferences) {
        self.dark_mode = prefs.dark_mode;
        self.voice_settings = prefs.voice;
    }

    /// Quit the application.
    pub fn quit(&self) -> Vec<AppAction> {
        vec![AppAction::Quit]
    }

    /// Settings that survive restarts.
    pub fn preferences(&self) -> Preferences {
        Preferences { dark_mode: self.dark_mode, voice: self.voice_settings.clone() }
    }

    /// Chat log.
    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    /// Whether an answer is pending.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Connection state.
    pub fn connection_state(&self) -> ConnectionState {
        self.connection
    }

    /// Whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.connection == ConnectionState::Connected
    }

    /// Model reported as loaded.
    pub fn current_model(&self) -> Option<&ModelInfo> {
        self.current_model.as_ref()
    }

    /// Generation parameters.
    pub fn model_settings(&self) -> &ModelSettings {
        &self.model_settings
    }

    /// Loadable models.
    pub fn available_models(&self) -> &[ModelInfo] {
        &self.available_models
    }

    /// Whether the microphone is recording.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Whether speech is playing.
    pub fn is_speaking(&self) -> bool {
        self.speaking
    }

    /// Speech synthesis settings.
    pub fn voice_settings(&self) -> &VoiceSettings {
        &self.voice_settings
    }

    /// Speech recognition settings.
    pub fn transcription_settings(&self) -> &TranscriptionSettings {
        &self.transcription_settings
    }

    /// Loaded document name.
    pub fn loaded_document(&self) -> Option<&str> {
        self.loaded_document.as_deref()
    }

    /// Dark colour scheme.
    pub fn dark_mode(&self) -> bool {
        self.dark_mode
    }

    /// Visible notifications, oldest first.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Store counters plus the session count.
    pub fn stats(&self) -> SessionStats {
        let stats = self.store.stats();
        SessionStats {
            total_messages: stats.total_messages,
            total_tokens: stats.total_tokens,
            sessions_today: self.sessions_today,
        }
    }

    /// Terminal dimensions (columns, rows).
    pub fn terminal_size(&self) -> (u16, u16) {
        self.terminal_size
    }
}
