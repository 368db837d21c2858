//! UI rendering
//!
//! Rendering functions that convert App state into terminal output using
//! ratatui widgets. All functions are pure (no I/O), taking state and
//! returning widget trees.

mod chat;
mod input;
mod status;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout},
    style::{Color, Style},
};

pub use status::status_text;

use crate::{App, InputState};

/// Render the entire UI.
pub fn render(frame: &mut Frame, app: &App, input_state: &InputState) {
    const CHAT_AREA_MIN_HEIGHT: u16 = 3;
    const INPUT_HEIGHT: u16 = 3;
    const STATUS_HEIGHT: u16 = 1;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(CHAT_AREA_MIN_HEIGHT),
            Constraint::Length(INPUT_HEIGHT),
            Constraint::Length(STATUS_HEIGHT),
        ])
        .split(frame.area());

    let [chat_area, input_area, status_area] = chunks.as_ref() else {
        return;
    };

    chat::render(frame, app, *chat_area);
    input::render(frame, app, input_state, *input_area);
    status::render(frame, app, *status_area);
}

/// Base text style for the current theme.
fn base_style(app: &App) -> Style {
    if app.dark_mode() {
        Style::default().fg(Color::White).bg(Color::Black)
    } else {
        Style::default()
    }
}

#[cfg(test)]
mod tests {
    use memoai_app::{AppEvent, ConnectionState};
    use memoai_client::MessageId;
    use memoai_core::{Message, Role, StoreAction};
    use ratatui::{Terminal, backend::TestBackend};

    use super::*;

    fn draw(app: &App, input: &InputState, width: u16, height: u16) -> Vec<String> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(frame, app, input)).unwrap();

        let buffer = terminal.backend().buffer();
        (0..height)
            .map(|y| (0..width).map(|x| buffer[(x, y)].symbol()).collect::<String>())
            .collect()
    }

    fn add(app: &mut App, id: u128, role: Role, content: &str, streaming: bool) {
        let timestamp = chrono::DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let message =
            Message::new(MessageId::from_raw(id), role, content, timestamp).streaming(streaming);
        app.handle(AppEvent::Store(StoreAction::AddMessage { message }));
    }

    #[test]
    fn empty_chat_shows_placeholder() {
        let app = App::new();
        let screen = draw(&app, &InputState::new(), 50, 10);

        assert!(screen.iter().any(|line| line.contains("Ask anything")));
        assert!(screen[9].contains("Disconnected"));
    }

    #[test]
    fn conversation_is_rendered_with_roles() {
        let mut app = App::new();
        app.handle(AppEvent::ConnectionChanged(ConnectionState::Connected));
        add(&mut app, 1, Role::User, "Hi", false);
        add(&mut app, 2, Role::Assistant, "Hello\nthere", true);

        let screen = draw(&app, &InputState::new(), 50, 12);

        assert!(screen.iter().any(|line| line.contains("you") && line.contains("Hi")));
        assert!(screen.iter().any(|line| line.contains("ai") && line.contains("Hello")));
        assert!(screen.iter().any(|line| line.contains("there▌")));
        assert!(screen[11].contains("Connected"));
    }

    #[test]
    fn long_history_keeps_latest_lines_visible() {
        let mut app = App::new();
        for i in 0..30 {
            add(&mut app, i, Role::User, &format!("message {i}"), false);
        }

        let screen = draw(&app, &InputState::new(), 40, 10);

        assert!(screen.iter().any(|line| line.contains("message 29")));
        assert!(!screen.iter().any(|line| line.contains("message 0 ")));
    }

    #[test]
    fn input_buffer_is_shown() {
        let app = App::new();
        let mut input = InputState::new();
        let mut scratch = App::new();
        let now = chrono::DateTime::from_timestamp(0, 0).unwrap();
        for c in "draft".chars() {
            input.handle_key(crate::KeyInput::Char(c), &mut scratch, now);
        }

        let screen = draw(&app, &input, 40, 8);

        assert!(screen.iter().any(|line| line.contains("> draft")));
    }
}
