//! Simulation driver implementing the Driver trait.
//!
//! `SimDriver` provides the same interface as the terminal driver but for
//! deterministic testing. It implements [`Driver`] so the same
//! [`memoai_app::Runtime`] orchestration code runs in both production and
//! simulation.
//!
//! The transport is a [`SimBackend`] behind an in-memory queue. Replies are
//! queued the moment a request is sent; how many reach the client per cycle
//! is bounded by [`SimDriver::with_packets_per_cycle`], which is what lets a
//! test interleave user input with a half-delivered answer.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use memoai_app::{App, AppAction, AppEvent, Driver, TransportEvent};
use memoai_core::env::Environment;
use memoai_proto::Packet;

use crate::{
    invariants::{InvariantRegistry, SystemSnapshot},
    sim_backend::SimBackend,
    sim_env::{SimEnv, SimInstant},
};

/// Error type for simulation driver.
#[derive(Debug, Clone)]
pub struct SimDriverError(pub String);

impl std::fmt::Display for SimDriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SimDriverError: {}", self.0)
    }
}

impl std::error::Error for SimDriverError {}

/// A user input queued for the next poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Submit a chat message.
    Send(String),
    /// Stop the current answer.
    Stop,
    /// Force a fresh connection.
    Reconnect,
    /// Enable or pause automatic reconnection.
    AutoReconnect(bool),
    /// Clear the chat log.
    Clear,
    /// Flip the theme.
    ToggleDarkMode,
    /// Leave the application.
    Quit,
    /// Any other application event.
    Event(AppEvent),
}

impl Input {
    fn apply(self, app: &mut App) -> Vec<AppAction> {
        match self {
            Self::Send(text) => app.send_message(&text),
            Self::Stop => app.stop_generation(),
            Self::Reconnect => app.reconnect(),
            Self::AutoReconnect(enabled) => app.set_auto_reconnect(enabled),
            Self::Clear => app.clear_messages(),
            Self::ToggleDarkMode => app.toggle_dark_mode(),
            Self::Quit => app.quit(),
            Self::Event(event) => app.handle(event),
        }
    }
}

/// Shared state for input and packet injection.
///
/// This allows injection from outside async contexts.
#[derive(Default)]
struct SharedState {
    pending_inputs: VecDeque<Input>,
    inbound: VecDeque<TransportEvent>,
    sent: Vec<Packet>,
    opened: Vec<String>,
    backend: SimBackend,
    transport_open: bool,
    refuse_transport: bool,
    packets_per_cycle: Option<usize>,
    budget: Option<usize>,
    renders: usize,
}

/// Simulation driver for deterministic testing.
///
/// Clones share the same backend and queues, so a test can keep a handle
/// while the [`memoai_app::Runtime`] owns the driver.
#[derive(Clone)]
pub struct SimDriver {
    state: Arc<Mutex<SharedState>>,
    env: SimEnv,
    invariants: Option<Arc<InvariantRegistry>>,
}

impl SimDriver {
    /// Driver on `env` talking to `backend`.
    pub fn new(env: SimEnv, backend: SimBackend) -> Self {
        let state = SharedState { backend, ..SharedState::default() };
        Self { state: Arc::new(Mutex::new(state)), env, invariants: None }
    }

    /// Enable invariant checking on every render.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(Arc::new(registry));
        self
    }

    /// Deliver at most `count` transport events per cycle.
    #[must_use]
    pub fn with_packets_per_cycle(self, count: usize) -> Self {
        self.lock().packets_per_cycle = Some(count);
        self
    }

    fn lock(&self) -> MutexGuard<'_, SharedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a user input for the next poll.
    pub fn inject_input(&self, input: Input) {
        self.lock().pending_inputs.push_back(input);
    }

    /// Make the next transport opens fail (or succeed again).
    pub fn refuse_transport(&self, refuse: bool) {
        self.lock().refuse_transport = refuse;
    }

    /// Drop the live transport from the server side.
    ///
    /// Packets not yet delivered are lost; the client sees the close next.
    pub fn inject_disconnect(&self, reason: &str) {
        let mut state = self.lock();
        if !state.transport_open {
            return;
        }
        state.transport_open = false;
        state.backend.on_close();
        state.inbound.clear();
        state.inbound.push_back(TransportEvent::Closed { reason: reason.to_string() });
    }

    /// Queue a server ping, if a transport is open.
    pub fn server_ping(&self) {
        let mut state = self.lock();
        if !state.transport_open {
            return;
        }
        if let Some(ping) = state.backend.ping() {
            state.inbound.push_back(TransportEvent::Packet(ping));
        }
    }

    /// Run `f` against the backend.
    pub fn with_backend<R>(&self, f: impl FnOnce(&mut SimBackend) -> R) -> R {
        f(&mut self.lock().backend)
    }

    /// Every packet the client sent, in order.
    pub fn sent(&self) -> Vec<Packet> {
        self.lock().sent.clone()
    }

    /// Urls of every transport opened.
    pub fn opened(&self) -> Vec<String> {
        self.lock().opened.clone()
    }

    /// Whether a transport is live.
    pub fn transport_open(&self) -> bool {
        self.lock().transport_open
    }

    /// Number of frames rendered.
    pub fn renders(&self) -> usize {
        self.lock().renders
    }

    /// No input and no transport event is pending.
    pub fn is_idle(&self) -> bool {
        let state = self.lock();
        state.pending_inputs.is_empty() && state.inbound.is_empty()
    }

    /// Check invariants against App state.
    pub fn check_invariants(&self, app: &App, context: &str) {
        if let Some(registry) = &self.invariants {
            registry.assert_all(&SystemSnapshot::from_app(app), context);
        }
    }
}

impl Driver for SimDriver {
    type Error = SimDriverError;
    type Instant = SimInstant;

    async fn poll_event(&mut self, app: &mut App) -> Result<Vec<AppAction>, Self::Error> {
        let input = {
            let mut state = self.lock();
            state.budget = state.packets_per_cycle;
            state.pending_inputs.pop_front()
        };

        Ok(input.map(|input| input.apply(app)).unwrap_or_default())
    }

    async fn open_transport(&mut self, url: &str) -> Result<(), Self::Error> {
        let mut state = self.lock();
        state.opened.push(url.to_string());
        if state.refuse_transport {
            return Err(SimDriverError("connection refused".to_string()));
        }

        state.transport_open = true;
        state.inbound.clear();
        let handshake = state.backend.on_open();
        state.inbound.extend(handshake.into_iter().map(TransportEvent::Packet));
        Ok(())
    }

    fn close_transport(&mut self) {
        let mut state = self.lock();
        state.transport_open = false;
        state.inbound.clear();
        state.backend.on_close();
    }

    async fn send_packet(&mut self, packet: Packet) -> Result<(), Self::Error> {
        let mut state = self.lock();
        if !state.transport_open {
            return Err(SimDriverError("transport not open".to_string()));
        }

        let replies = state.backend.handle(&packet);
        state.sent.push(packet);
        state.inbound.extend(replies.into_iter().map(TransportEvent::Packet));
        Ok(())
    }

    async fn recv_packet(&mut self) -> Option<TransportEvent> {
        let mut state = self.lock();
        if state.budget == Some(0) {
            return None;
        }

        let event = state.inbound.pop_front()?;
        if let Some(budget) = state.budget.as_mut() {
            *budget -= 1;
        }
        Some(event)
    }

    fn now(&self) -> SimInstant {
        self.env.now()
    }

    fn render(&mut self, app: &App) -> Result<(), Self::Error> {
        let renders = {
            let mut state = self.lock();
            state.renders += 1;
            state.renders
        };
        self.check_invariants(app, &format!("after render #{renders}"));
        Ok(())
    }

    fn stop(&mut self) {
        self.close_transport();
    }
}
