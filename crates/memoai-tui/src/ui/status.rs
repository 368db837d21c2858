//! Status bar
//!
//! Displays connection status, session statistics and the latest
//! notification.

use memoai_app::{App, ConnectionState};
use memoai_client::NotificationLevel;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

/// Render the status bar.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let paragraph = Paragraph::new(status_line(app))
        .style(Style::default().bg(Color::DarkGray).fg(Color::White));

    frame.render_widget(paragraph, area);
}

/// Plain text of the status bar.
pub fn status_text(app: &App) -> String {
    status_line(app).spans.iter().map(|span| span.content.as_ref()).collect()
}

fn status_line(app: &App) -> Line<'static> {
    let connection_status = match app.connection_state() {
        ConnectionState::Disconnected => {
            Span::styled("Disconnected", Style::default().fg(Color::Red))
        },
        ConnectionState::Connecting => {
            Span::styled("Connecting...", Style::default().fg(Color::Yellow))
        },
        ConnectionState::Connected => Span::styled(
            "Connected",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ),
    };

    let stats = app.stats();
    let session_info =
        format!(" | Messages: {} | Tokens: ~{}", stats.total_messages, stats.total_tokens);

    let mut spans = vec![
        Span::raw(" "),
        connection_status,
        Span::styled(session_info, Style::default().fg(Color::Gray)),
    ];

    if let Some(latest) = app.notifications().last() {
        let color = match latest.level {
            NotificationLevel::Success => Color::Green,
            NotificationLevel::Info => Color::Cyan,
            NotificationLevel::Warning => Color::Yellow,
            NotificationLevel::Error => Color::Red,
        };
        spans.push(Span::raw(" | "));
        spans.push(Span::styled(latest.message.clone(), Style::default().fg(color)));
    }

    Line::from(spans)
}
