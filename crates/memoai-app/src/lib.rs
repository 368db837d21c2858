//! Application layer for MemoAI
//!
//! Pure state machines and generic runtime for UI and protocol orchestration,
//! enabling deterministic simulation testing with the same code that runs in
//! production.
//!
//! # Components
//!
//! - [`App`]: UI state machine (chat log, loading, settings, notifications)
//! - [`Bridge`]: Protocol bridge (translates App actions to Client events)
//! - [`Driver`]: Trait for platform-specific I/O abstraction
//! - [`Runtime`]: Generic orchestration loop using Driver
//! - [`prefs`]: Settings persisted across runs
//! - [`SystemEnv`]: Production environment

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod action;
mod app;
mod bridge;
mod driver;
mod event;
pub mod prefs;
mod runtime;
pub mod state;
mod system_env;

pub use action::AppAction;
pub use app::{App, MAX_NOTIFICATIONS};
pub use bridge::{Bridge, NOT_CONNECTED_MESSAGE, TransportCommand};
pub use driver::{Driver, TransportEvent};
pub use event::AppEvent;
pub use memoai_core::ConnectionState;
pub use runtime::{MAX_TRANSPORT_EVENTS_PER_CYCLE, Runtime};
pub use system_env::SystemEnv;
