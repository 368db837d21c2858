//! Input state and key handling for the TUI.
//!
//! This module owns all text input state (buffer, cursor) and handles
//! character-level key events. Command parsing happens here on Enter.
//!
//! The cursor counts characters, not bytes, so Cyrillic input edits
//! correctly.

use chrono::{DateTime, Utc};
use memoai_app::{App, AppAction};
use memoai_client::NotificationLevel;

use crate::commands::{self, Command, HELP};

/// Key input events from the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Character input.
    Char(char),
    /// Enter/Return key.
    Enter,
    /// Backspace key.
    Backspace,
    /// Delete key.
    Delete,
    /// Escape key.
    Esc,
    /// Ctrl+C.
    Interrupt,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Home key.
    Home,
    /// End key.
    End,
}

/// Input state for the TUI.
///
/// Manages the text input buffer and cursor position.
/// Handles all character-level key events.
#[derive(Debug, Default)]
pub struct InputState {
    /// Text buffer for user input.
    buffer: String,
    /// Cursor position within the buffer, in characters.
    cursor: usize,
}

impl InputState {
    /// Create a new empty input state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current text in the input buffer.
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Current cursor position, in characters.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn char_count(&self) -> usize {
        self.buffer.chars().count()
    }

    fn byte_offset(&self, cursor: usize) -> usize {
        self.buffer.char_indices().nth(cursor).map_or(self.buffer.len(), |(i, _)| i)
    }

    /// Handle a key input event.
    ///
    /// `now` stamps any notification the key raises. Returns actions to
    /// process (may be empty for input-only keys, or contain protocol
    /// actions for commands).
    pub fn handle_key(
        &mut self,
        key: KeyInput,
        app: &mut App,
        now: DateTime<Utc>,
    ) -> Vec<AppAction> {
        match key {
            KeyInput::Char(c) => {
                let offset = self.byte_offset(self.cursor);
                self.buffer.insert(offset, c);
                self.cursor += 1;
                vec![AppAction::Render]
            },
            KeyInput::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    let offset = self.byte_offset(self.cursor);
                    self.buffer.remove(offset);
                }
                vec![AppAction::Render]
            },
            KeyInput::Delete => {
                if self.cursor < self.char_count() {
                    let offset = self.byte_offset(self.cursor);
                    self.buffer.remove(offset);
                }
                vec![AppAction::Render]
            },
            KeyInput::Left => {
                self.cursor = self.cursor.saturating_sub(1);
                vec![AppAction::Render]
            },
            KeyInput::Right => {
                self.cursor = (self.cursor + 1).min(self.char_count());
                vec![AppAction::Render]
            },
            KeyInput::Home => {
                self.cursor = 0;
                vec![AppAction::Render]
            },
            KeyInput::End => {
                self.cursor = self.char_count();
                vec![AppAction::Render]
            },
            KeyInput::Enter => self.handle_enter(app, now),
            KeyInput::Esc if app.is_loading() => app.stop_generation(),
            KeyInput::Esc | KeyInput::Interrupt => app.quit(),
        }
    }

    /// Handle Enter key - parse command and call App API.
    ///
    /// A message typed while an answer is pending stays in the buffer.
    fn handle_enter(&mut self, app: &mut App, now: DateTime<Utc>) -> Vec<AppAction> {
        let command = commands::parse(&self.buffer);
        if matches!(command, Command::Message { .. }) && app.is_loading() {
            return vec![];
        }

        self.buffer.clear();
        self.cursor = 0;

        let mut actions = match command {
            Command::Message { content } => app.send_message(&content),
            Command::Stop => app.stop_generation(),
            Command::Clear => app.clear_messages(),
            Command::Reconnect => app.reconnect(),
            Command::AutoReconnect(enabled) => {
                let mut actions = app.set_auto_reconnect(enabled);
                let state = if enabled { "enabled" } else { "paused" };
                actions.extend(app.add_notification(
                    NotificationLevel::Info,
                    format!("Auto reconnect {state}"),
                    now,
                ));
                actions
            },
            Command::DarkMode => app.toggle_dark_mode(),
            Command::Help => app.add_notification(NotificationLevel::Info, HELP.to_string(), now),
            Command::Quit => app.quit(),
            Command::Unknown { input } => app.add_notification(
                NotificationLevel::Warning,
                format!("Unknown command: {input}"),
                now,
            ),
            Command::InvalidArgs { command, error } => {
                app.add_notification(NotificationLevel::Warning, format!("/{command}: {error}"), now)
            },
        };
        actions.push(AppAction::Render);
        actions
    }
}
