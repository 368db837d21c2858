//! Generic runtime for application orchestration.
//!
//! The Runtime drives the application event loop, coordinating between:
//! - [`App`]: UI state machine
//! - [`Bridge`]: Protocol bridge to Client
//! - [`Driver`]: Platform-specific I/O
//! - [`PreferenceStore`]: settings that survive restarts

use memoai_client::{ClientConfig, Environment};

use crate::{
    App, AppAction, AppEvent, Bridge, Driver, TransportCommand, TransportEvent,
    prefs::{PreferenceStore, Preferences},
};

/// Upper bound on transport events drained per cycle, so a chatty server
/// cannot starve input handling.
pub const MAX_TRANSPORT_EVENTS_PER_CYCLE: usize = 64;

/// Generic runtime that orchestrates App, Bridge, and Driver.
///
/// # Type Parameters
///
/// - `D`: Platform-specific I/O driver
/// - `E`: Environment for time and randomness
/// - `P`: Preference storage
pub struct Runtime<D, E, P>
where
    D: Driver,
    E: Environment,
    P: PreferenceStore,
{
    driver: D,
    app: App,
    bridge: Bridge<E>,
    prefs: P,
}

impl<D, E, P> Runtime<D, E, P>
where
    D: Driver<Instant = E::Instant>,
    E: Environment,
    P: PreferenceStore,
{
    /// Create a new runtime with the given driver, environment and stores.
    pub fn new(driver: D, env: E, config: ClientConfig, prefs: P) -> Self {
        Self { driver, app: App::new(), bridge: Bridge::new(env, config), prefs }
    }

    /// Run the main event loop.
    ///
    /// 1. Restores preferences and renders the first frame
    /// 2. Starts connecting
    /// 3. Loops: input, transport events, tick, until the app quits
    ///
    /// # Errors
    ///
    /// Returns an error if the driver fails to poll input or render.
    /// Transport failures are not errors: they reach the client, which
    /// schedules a retry.
    pub async fn run(mut self) -> Result<(), D::Error> {
        let mut should_quit = self.start().await?;

        while !should_quit {
            should_quit = self.process_cycle().await?;
        }

        self.driver.stop();
        Ok(())
    }

    /// Restore preferences, render the first frame and begin connecting.
    ///
    /// Returns `true` if the application should quit.
    pub async fn start(&mut self) -> Result<bool, D::Error> {
        self.restore_preferences();
        self.driver.render(&self.app)?;

        let events = self.bridge.start();
        self.process_bridge_events(events).await
    }

    /// Process one cycle of the event loop.
    ///
    /// Returns `true` if the application should quit.
    pub async fn process_cycle(&mut self) -> Result<bool, D::Error> {
        let actions = self.driver.poll_event(&mut self.app).await?;
        if !actions.is_empty() && self.process_actions(actions).await? {
            return Ok(true);
        }

        for _ in 0..MAX_TRANSPORT_EVENTS_PER_CYCLE {
            let Some(event) = self.driver.recv_packet().await else {
                break;
            };

            let events = match event {
                TransportEvent::Packet(packet) => self.bridge.handle_packet(packet),
                TransportEvent::Closed { reason } => self.bridge.transport_closed(reason),
            };
            if self.process_bridge_events(events).await? {
                return Ok(true);
            }
        }

        let now = self.driver.now();
        let events = self.bridge.handle_tick(now);
        self.process_bridge_events(events).await
    }

    /// Process actions returned by the App.
    ///
    /// Returns `true` if should quit.
    async fn process_actions(&mut self, initial_actions: Vec<AppAction>) -> Result<bool, D::Error> {
        let mut pending_actions = initial_actions;

        while !pending_actions.is_empty() {
            let actions = std::mem::take(&mut pending_actions);

            for action in actions {
                match action {
                    AppAction::Render => self.driver.render(&self.app)?,
                    AppAction::Quit => return Ok(true),
                    AppAction::SavePreferences(prefs) => self.save_preferences(&prefs),

                    // Protocol operations go through the bridge
                    AppAction::SendMessage { .. }
                    | AppAction::StopGeneration
                    | AppAction::Reconnect
                    | AppAction::SuspendReconnect
                    | AppAction::ResumeReconnect
                    | AppAction::MessagesCleared => {
                        let mut events = self.bridge.process_app_action(action);
                        events.extend(self.execute_transport_commands().await);
                        for event in events {
                            pending_actions.extend(self.app.handle(event));
                        }
                    },
                }
            }
        }
        Ok(false)
    }

    /// Process events from Bridge back to App.
    async fn process_bridge_events(&mut self, mut events: Vec<AppEvent>) -> Result<bool, D::Error> {
        events.extend(self.execute_transport_commands().await);

        let mut actions = Vec::new();
        for event in events {
            actions.extend(self.app.handle(event));
        }
        self.process_actions(actions).await
    }

    /// Run queued transport commands until the queue is empty.
    ///
    /// Driver failures are reported back to the client; the events that
    /// produces are returned for the App.
    async fn execute_transport_commands(&mut self) -> Vec<AppEvent> {
        let mut events = Vec::new();

        while self.bridge.has_commands() {
            for command in self.bridge.take_commands() {
                match command {
                    TransportCommand::Open { url } => {
                        tracing::info!(%url, "opening transport");
                        let result = self.driver.open_transport(&url).await;
                        events.extend(match result {
                            Ok(()) => self.bridge.transport_opened(),
                            Err(e) => self.bridge.transport_failed(e.to_string()),
                        });
                    },
                    TransportCommand::Send(packet) => {
                        if let Err(e) = self.driver.send_packet(packet).await {
                            tracing::warn!("Failed to send packet: {e}");
                            events.extend(self.bridge.transport_closed(e.to_string()));
                        }
                    },
                    TransportCommand::Close => self.driver.close_transport(),
                }
            }
        }

        events
    }

    fn restore_preferences(&mut self) {
        match Preferences::load(&self.prefs) {
            Ok(prefs) => self.app.apply_preferences(prefs),
            Err(e) => tracing::warn!("Failed to load preferences, using defaults: {e}"),
        }
    }

    fn save_preferences(&self, prefs: &Preferences) {
        if let Err(e) = prefs.save(&self.prefs) {
            tracing::warn!("Failed to save preferences: {e}");
        }
    }

    /// Get a reference to the App
    pub fn app(&self) -> &App {
        &self.app
    }

    /// Get a mutable reference to the App
    pub fn app_mut(&mut self) -> &mut App {
        &mut self.app
    }

    /// Get a reference to the Bridge
    pub fn bridge(&self) -> &Bridge<E> {
        &self.bridge
    }

    /// Get a reference to the Driver
    pub fn driver(&self) -> &D {
        &self.driver
    }
}
