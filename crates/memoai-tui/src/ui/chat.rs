//! Chat area
//!
//! Displays the conversation, newest lines at the bottom.

use memoai_app::App;
use memoai_core::Role;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
};

const BORDER_SIZE: u16 = 2;
/// Width of the role label column, including the trailing space.
const LABEL_WIDTH: usize = 5;
/// Appended to an answer that is still arriving.
const STREAMING_CURSOR: &str = "▌";

/// Render the chat area.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .current_model()
        .map_or_else(|| " MemoAI ".to_string(), |m| format!(" MemoAI · {} ", m.display_name()));

    let block = Block::default().borders(Borders::ALL).title(title).style(super::base_style(app));

    let messages = app.store().messages();
    let items: Vec<ListItem> = if messages.is_empty() {
        vec![ListItem::new(Line::from(Span::styled(
            "Ask anything to start chatting",
            Style::default().fg(Color::DarkGray),
        )))]
    } else {
        messages
            .iter()
            .flat_map(|msg| {
                let (label, color) = match msg.role {
                    Role::User => ("you", Color::Green),
                    Role::Assistant => ("ai", Color::Cyan),
                };

                let mut text = msg.content.clone();
                if msg.streaming {
                    text.push_str(STREAMING_CURSOR);
                }

                text.split('\n')
                    .enumerate()
                    .map(|(i, line)| {
                        let prefix = if i == 0 {
                            Span::styled(
                                format!("{label:<LABEL_WIDTH$}"),
                                Style::default().fg(color).add_modifier(Modifier::BOLD),
                            )
                        } else {
                            Span::raw(" ".repeat(LABEL_WIDTH))
                        };
                        ListItem::new(Line::from(vec![prefix, Span::raw(line.to_string())]))
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    };

    let visible_height = area.height.saturating_sub(BORDER_SIZE) as usize;
    let skip = items.len().saturating_sub(visible_height);
    let visible_items: Vec<_> = items.into_iter().skip(skip).collect();

    let list = List::new(visible_items).block(block);

    frame.render_widget(list, area);
}
