//! Terminal driver for the TUI.
//!
//! Implements the [`Driver`] trait for terminal I/O using crossterm for
//! keyboard events and ratatui for rendering. Network uses a WebSocket from
//! [`memoai_client::transport`].

use std::{
    io::{self, Stdout, stdout},
    time::{Duration, Instant},
};

use crossterm::{
    ExecutableCommand,
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures::StreamExt;
use memoai_app::{App, AppAction, AppEvent, Driver, SystemEnv, TransportEvent};
use memoai_client::{
    Environment,
    transport::{self, ConnectedClient, TransportError},
};
use memoai_proto::Packet;
use ratatui::{Terminal, backend::CrosstermBackend};
use thiserror::Error;
use tokio::sync::mpsc::error::TryRecvError;

use crate::{InputState, KeyInput, ui};

/// How long to wait for a key before ticking.
const TICK_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_millis(100);

/// Terminal driver errors.
#[derive(Debug, Error)]
pub enum TerminalError {
    /// I/O error from terminal operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Transport error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The WebSocket handshake did not finish in time.
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),

    /// No transport is open.
    #[error("not connected")]
    NotConnected,

    /// Channel send error.
    #[error("channel send error")]
    ChannelSend,
}

/// Terminal driver implementing the [`Driver`] trait.
///
/// Handles terminal I/O (crossterm), rendering (ratatui), and the WebSocket
/// transport. Owns the input state for text editing.
pub struct TerminalDriver {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    event_stream: EventStream,
    connection: Option<ConnectedClient>,
    input_state: InputState,
    env: SystemEnv,
    connect_timeout: Duration,
}

impl TerminalDriver {
    /// Create a new terminal driver.
    ///
    /// Switches the terminal to raw mode on the alternate screen; dropping
    /// the driver restores it. Opening a transport gives up after
    /// `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Result<Self, TerminalError> {
        enable_raw_mode()?;
        stdout().execute(EnterAlternateScreen)?;

        let backend = CrosstermBackend::new(stdout());
        let terminal = Terminal::new(backend)?;
        let event_stream = EventStream::new();

        Ok(Self {
            terminal,
            event_stream,
            connection: None,
            input_state: InputState::new(),
            env: SystemEnv::new(),
            connect_timeout,
        })
    }

    /// Convert a crossterm key event to `KeyInput`.
    fn convert_key(key: KeyEvent) -> Option<KeyInput> {
        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(KeyInput::Interrupt)
            },
            KeyCode::Char(c) => Some(KeyInput::Char(c)),
            KeyCode::Enter => Some(KeyInput::Enter),
            KeyCode::Backspace => Some(KeyInput::Backspace),
            KeyCode::Delete => Some(KeyInput::Delete),
            KeyCode::Esc => Some(KeyInput::Esc),
            KeyCode::Left => Some(KeyInput::Left),
            KeyCode::Right => Some(KeyInput::Right),
            KeyCode::Home => Some(KeyInput::Home),
            KeyCode::End => Some(KeyInput::End),
            _ => None,
        }
    }
}

impl Driver for TerminalDriver {
    type Error = TerminalError;
    type Instant = Instant;

    async fn poll_event(&mut self, app: &mut App) -> Result<Vec<AppAction>, Self::Error> {
        tokio::select! {
            biased;

            // Terminal events
            maybe_event = self.event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) if key_event.kind == KeyEventKind::Press => {
                        match Self::convert_key(key_event) {
                            Some(key_input) => {
                                let now = self.env.wall_clock();
                                Ok(self.input_state.handle_key(key_input, app, now))
                            },
                            None => Ok(vec![]),
                        }
                    },
                    Some(Ok(Event::Resize(cols, rows))) => {
                        Ok(app.handle(AppEvent::Resize(cols, rows)))
                    },
                    Some(Err(e)) => Err(TerminalError::Io(e)),
                    _ => Ok(vec![]),
                }
            }

            // Tick timeout
            () = tokio::time::sleep(TICK_INTERVAL) => {
                Ok(app.handle(AppEvent::Tick))
            }
        }
    }

    async fn open_transport(&mut self, url: &str) -> Result<(), Self::Error> {
        self.close_transport();
        let client = connect_within(url, self.connect_timeout).await?;
        self.connection = Some(client);
        Ok(())
    }

    fn close_transport(&mut self) {
        if let Some(conn) = self.connection.take() {
            conn.stop();
        }
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), Self::Error> {
        let conn = self.connection.as_ref().ok_or(TerminalError::NotConnected)?;
        conn.to_server.send(packet).await.map_err(|_| TerminalError::ChannelSend)
    }

    async fn recv_packet(&mut self) -> Option<TransportEvent> {
        let conn = self.connection.as_mut()?;

        match conn.from_server.try_recv() {
            Ok(Ok(packet)) => Some(TransportEvent::Packet(packet)),
            Ok(Err(e)) => {
                self.connection = None;
                Some(TransportEvent::Closed { reason: e.to_string() })
            },
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.connection = None;
                Some(TransportEvent::Closed { reason: "transport task ended".to_string() })
            },
        }
    }

    fn now(&self) -> Self::Instant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        self.terminal.draw(|frame| {
            ui::render(frame, app, &self.input_state);
        })?;
        Ok(())
    }

    fn stop(&mut self) {
        self.close_transport();
    }
}

/// Open a WebSocket, giving up after `limit`.
///
/// A host that accepts TCP but never answers the upgrade would otherwise
/// stall the event loop until the OS gives up.
async fn connect_within(url: &str, limit: Duration) -> Result<ConnectedClient, TerminalError> {
    tokio::time::timeout(limit, transport::connect(url))
        .await
        .map_err(|_| TerminalError::ConnectTimeout(limit))?
        .map_err(TerminalError::from)
}

impl Drop for TerminalDriver {
    fn drop(&mut self) {
        self.stop();
        let _ = disable_raw_mode();
        let _ = stdout().execute(LeaveAlternateScreen);
    }
}
