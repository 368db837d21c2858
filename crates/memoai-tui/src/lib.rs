//! Terminal UI for MemoAI
//!
//! A thin shell over [`memoai_app::Driver`] that provides terminal-specific
//! I/O. All orchestration logic lives in the generic [`memoai_app::Runtime`].
//!
//! This crate only handles terminal input, rendering and the WebSocket.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod cli;
pub mod commands;
pub mod input;
pub mod terminal;
pub mod ui;

pub use cli::Args;
pub use input::{InputState, KeyInput};
pub use memoai_app::{App, AppAction, AppEvent, Driver, Runtime};
pub use terminal::{TerminalDriver, TerminalError};
