//! End-to-end simulation of the application runtime.
//!
//! # Test Strategy
//!
//! Each test runs the production [`Runtime`] against a [`SimDriver`]:
//! 1. Queue user input on the driver
//! 2. Run cycles until input and transport queues drain
//! 3. Move virtual time to fire retries and timeouts
//! 4. Verify App state and the traffic the backend saw
//!
//! # Oracle Pattern
//!
//! Tests end with oracle checks that verify:
//! - The chat log holds the expected messages, none left streaming
//! - The loading indicator settled
//! - Quiescent invariants hold

use std::time::Duration;

use memoai_app::{
    ConnectionState, Runtime,
    prefs::{DARK_MODE_KEY, MemoryPreferenceStore, PreferenceStore},
    state::ModelSettings,
};
use memoai_client::{ClientConfig, NotificationLevel};
use memoai_core::Role;
use memoai_harness::{
    BackendConfig, Input, InvariantRegistry, SimBackend, SimDriver, SimEnv, SystemSnapshot,
};
use memoai_proto::Packet;

type SimRuntime = Runtime<SimDriver, SimEnv, MemoryPreferenceStore>;

struct Sim {
    env: SimEnv,
    driver: SimDriver,
    prefs: MemoryPreferenceStore,
    runtime: SimRuntime,
}

impl Sim {
    fn new(backend: BackendConfig) -> Self {
        Self::build(backend, None, MemoryPreferenceStore::new())
    }

    fn build(
        backend: BackendConfig,
        packets_per_cycle: Option<usize>,
        prefs: MemoryPreferenceStore,
    ) -> Self {
        let env = SimEnv::with_seed(42);
        let mut driver = SimDriver::new(env.clone(), SimBackend::new(backend))
            .with_invariants(InvariantRegistry::standard());
        if let Some(count) = packets_per_cycle {
            driver = driver.with_packets_per_cycle(count);
        }

        let runtime =
            Runtime::new(driver.clone(), env.clone(), ClientConfig::default(), prefs.clone());
        Self { env, driver, prefs, runtime }
    }

    async fn start(&mut self) {
        let quit = self.runtime.start().await.unwrap();
        assert!(!quit);
        self.settle().await;
    }

    /// Run cycles until nothing is pending. Returns `true` on quit.
    async fn settle(&mut self) -> bool {
        for _ in 0..100 {
            if self.runtime.process_cycle().await.unwrap() {
                return true;
            }
            if self.driver.is_idle() {
                return false;
            }
        }
        unreachable!("simulation did not settle");
    }

    async fn cycle(&mut self) -> bool {
        self.runtime.process_cycle().await.unwrap()
    }

    async fn input(&mut self, input: Input) -> bool {
        self.driver.inject_input(input);
        self.settle().await
    }

    async fn advance(&mut self, duration: Duration) {
        self.env.advance(duration);
        self.settle().await;
    }

    fn assert_quiescent(&self, context: &str) {
        InvariantRegistry::quiescent()
            .assert_all(&SystemSnapshot::from_app(self.runtime.app()), context);
    }

    fn last_notification(&self) -> (NotificationLevel, String) {
        let last = self.runtime.app().notifications().last().unwrap();
        (last.level, last.message.clone())
    }

    fn event_names(&self) -> Vec<String> {
        self.driver
            .sent()
            .into_iter()
            .filter_map(|p| match p {
                Packet::Event { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }
}

#[tokio::test]
async fn connects_and_streams_answer() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;

    let app = sim.runtime.app();
    assert!(app.is_connected());
    assert_eq!(sim.last_notification(), (NotificationLevel::Success, "Connected to server".into()));

    sim.input(Input::Send("Hi".into())).await;

    let app = sim.runtime.app();
    let messages = app.store().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].content, "Hi");
    assert_eq!(messages[1].role, Role::Assistant);
    assert_eq!(messages[1].content, "Hello from MemoAI");
    assert_eq!(app.stats().total_messages, 2);
    assert!(sim.driver.renders() > 0);
    assert_eq!(sim.driver.with_backend(|b| b.received().to_vec()), vec!["Hi".to_string()]);
    sim.assert_quiescent("after streamed answer");
}

#[tokio::test]
async fn wire_transcript_of_a_session() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;
    sim.input(Input::Send("Hi".into())).await;

    let transcript: Vec<String> =
        sim.driver.sent().iter().map(|p| p.encode().unwrap()).collect();

    insta::assert_snapshot!(transcript.join("\n"), @r#"
    40
    42["chat_message",{"message":"Hi","streaming":true,"timestamp":"2024-01-01T00:00:00.000Z"}]
    "#);
    assert_eq!(
        sim.driver.opened(),
        vec!["ws://localhost:8000/socket.io/?EIO=4&transport=websocket".to_string()]
    );
}

#[tokio::test]
async fn non_streaming_answer_arrives_whole() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;
    let settings = ModelSettings { streaming: false, ..ModelSettings::default() };
    let _ = sim.runtime.app_mut().set_model_settings(settings);

    sim.input(Input::Send("Hi".into())).await;

    let messages = sim.runtime.app().store().messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].content, "Hello from MemoAI");
    sim.assert_quiescent("after whole answer");
}

#[tokio::test]
async fn refused_transport_retries_after_delay() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.driver.refuse_transport(true);
    sim.start().await;

    assert_eq!(sim.runtime.app().connection_state(), ConnectionState::Disconnected);
    let (level, message) = sim.last_notification();
    assert_eq!(level, NotificationLevel::Error);
    assert!(message.starts_with("Connection error:"), "{message}");

    sim.driver.refuse_transport(false);
    sim.settle().await;
    assert_eq!(sim.driver.opened().len(), 1, "retry must wait for the delay");

    sim.advance(Duration::from_secs(1)).await;

    assert!(sim.runtime.app().is_connected());
    assert_eq!(sim.driver.opened().len(), 2);
    assert_eq!(sim.last_notification().1, "Connected to server");
}

#[tokio::test]
async fn refused_namespace_connect_is_reported() {
    let mut sim = Sim::new(BackendConfig {
        refuse_connect: Some("unauthorized".into()),
        ..BackendConfig::default()
    });
    sim.start().await;

    assert!(!sim.runtime.app().is_connected());
    assert!(!sim.driver.transport_open());
    let (level, message) = sim.last_notification();
    assert_eq!(level, NotificationLevel::Error);
    assert!(message.contains("unauthorized"), "{message}");
}

#[tokio::test]
async fn stop_mid_stream_drops_late_chunks() {
    let mut sim = Sim::build(
        BackendConfig { reply: "Once upon a time".into(), ..BackendConfig::default() },
        Some(1),
        MemoryPreferenceStore::new(),
    );
    sim.start().await;

    sim.driver.inject_input(Input::Send("Tell me a story".into()));
    sim.cycle().await;
    let answer = &sim.runtime.app().store().messages()[1];
    assert_eq!(answer.content.trim(), "Once");
    assert!(answer.streaming);

    sim.driver.inject_input(Input::Stop);
    sim.settle().await;

    let app = sim.runtime.app();
    let answer = &app.store().messages()[1];
    assert_eq!(answer.content.trim(), "Once");
    assert!(!answer.streaming);
    assert!(!app.is_loading());
    assert!(app.notifications().iter().any(|n| n.message == "Generation stopped"));
    assert_eq!(sim.driver.with_backend(|b| b.stops()), 1);
    assert_eq!(sim.event_names(), vec!["chat_message", "stop_generation"]);
    sim.assert_quiescent("after stop");
}

#[tokio::test]
async fn server_error_settles_loading() {
    let mut sim = Sim::new(BackendConfig {
        fail_with: Some("model not loaded".into()),
        ..BackendConfig::default()
    });
    sim.start().await;

    sim.input(Input::Send("Hi".into())).await;

    let app = sim.runtime.app();
    assert_eq!(app.store().len(), 1);
    assert_eq!(
        sim.last_notification(),
        (NotificationLevel::Error, "Server error: model not loaded".into())
    );
    sim.assert_quiescent("after server error");
}

#[tokio::test]
async fn lost_transport_mid_stream_settles_and_recovers() {
    let mut sim = Sim::build(BackendConfig::default(), Some(1), MemoryPreferenceStore::new());
    sim.start().await;

    sim.driver.inject_input(Input::Send("Hi".into()));
    sim.cycle().await;
    assert!(sim.runtime.app().is_loading());

    sim.driver.inject_disconnect("connection reset");
    sim.settle().await;

    let app = sim.runtime.app();
    assert_eq!(app.connection_state(), ConnectionState::Disconnected);
    assert!(app.store().streaming().next().is_none());
    assert_eq!(
        sim.last_notification(),
        (NotificationLevel::Warning, "Connection lost: connection reset".into())
    );
    sim.assert_quiescent("after loss");

    sim.advance(Duration::from_secs(1)).await;

    assert!(sim.runtime.app().is_connected());
    assert_eq!(sim.last_notification().1, "Connection restored");
}

#[tokio::test]
async fn silent_server_times_out() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;

    sim.advance(Duration::from_secs(30)).await;
    sim.driver.server_ping();
    sim.settle().await;
    sim.advance(Duration::from_secs(30)).await;
    assert!(sim.runtime.app().is_connected(), "ping keeps the connection alive");
    assert!(sim.driver.sent().iter().any(|p| matches!(p, Packet::Pong(_))));

    sim.advance(Duration::from_secs(20)).await;

    assert!(!sim.runtime.app().is_connected());
    assert!(!sim.driver.transport_open());
    let (level, message) = sim.last_notification();
    assert_eq!(level, NotificationLevel::Warning);
    assert!(message.contains("heartbeat timeout"), "{message}");
}

#[tokio::test]
async fn manual_reconnect_opens_fresh_transport() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;

    sim.input(Input::Reconnect).await;
    assert!(!sim.driver.transport_open());
    assert_eq!(sim.runtime.app().connection_state(), ConnectionState::Disconnected);

    sim.advance(Duration::from_secs(1)).await;

    assert!(sim.runtime.app().is_connected());
    assert_eq!(sim.driver.with_backend(|b| b.sessions()), 2);
}

#[tokio::test]
async fn suspended_reconnect_waits_for_resume() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;

    sim.input(Input::AutoReconnect(false)).await;
    sim.driver.inject_disconnect("network down");
    sim.settle().await;
    sim.advance(Duration::from_secs(5)).await;

    assert!(!sim.runtime.app().is_connected());
    assert_eq!(sim.driver.opened().len(), 1);

    sim.input(Input::AutoReconnect(true)).await;

    assert!(sim.runtime.app().is_connected());
    assert_eq!(sim.driver.opened().len(), 2);
}

#[tokio::test]
async fn offline_send_is_rejected() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.driver.refuse_transport(true);
    sim.start().await;

    sim.input(Input::Send("Hi".into())).await;

    assert!(sim.runtime.app().store().is_empty());
    assert_eq!(sim.last_notification().1, "No connection to server");
    assert!(sim.driver.with_backend(|b| b.received().is_empty()));
}

#[tokio::test]
async fn clear_keeps_the_session() {
    let mut sim = Sim::new(BackendConfig::default());
    sim.start().await;
    sim.input(Input::Send("Hi".into())).await;

    sim.input(Input::Clear).await;

    let app = sim.runtime.app();
    assert!(app.store().is_empty());
    assert_eq!(app.stats().total_tokens, 0);
    assert!(app.is_connected());

    sim.input(Input::Send("Again".into())).await;
    assert_eq!(sim.runtime.app().store().len(), 2);
    sim.assert_quiescent("after clear and resend");
}

#[tokio::test]
async fn preferences_are_restored_and_saved() {
    let prefs = MemoryPreferenceStore::new();
    prefs.set(DARK_MODE_KEY, "true").unwrap();
    let mut sim = Sim::build(BackendConfig::default(), None, prefs);
    sim.start().await;
    assert!(sim.runtime.app().dark_mode());

    sim.input(Input::ToggleDarkMode).await;

    assert!(!sim.runtime.app().dark_mode());
    assert_eq!(sim.prefs.get(DARK_MODE_KEY).unwrap().as_deref(), Some("false"));
}

#[tokio::test]
async fn quit_stops_the_loop() {
    let sim = Sim::new(BackendConfig::default());
    sim.driver.inject_input(Input::Quit);

    sim.runtime.run().await.unwrap();

    assert!(!sim.driver.transport_open());
}
