//! Property-based tests for the full runtime.
//!
//! Tests verify that invariants hold under arbitrary sequences of user
//! input, network trouble and elapsed time. This ensures behavioral
//! correctness across all possible execution paths.

use std::time::Duration;

use memoai_app::{Runtime, prefs::MemoryPreferenceStore};
use memoai_client::ClientConfig;
use memoai_core::Role;
use memoai_harness::{Input, InvariantRegistry, SimBackend, SimDriver, SimEnv, SystemSnapshot};
use proptest::{prelude::*, test_runner::TestCaseError};

/// One step of a simulated session.
#[derive(Debug, Clone)]
enum Op {
    Send(String),
    Stop,
    Reconnect,
    Clear,
    Disconnect,
    Ping,
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => "[a-z]{1,8}( [a-z]{1,8}){0,3}".prop_map(Op::Send),
        1 => Just(Op::Stop),
        1 => Just(Op::Reconnect),
        1 => Just(Op::Clear),
        1 => Just(Op::Disconnect),
        1 => Just(Op::Ping),
        2 => (0u64..50_000).prop_map(Op::Advance),
    ]
}

fn op_strategy_without_clear() -> impl Strategy<Value = Op> {
    op_strategy().prop_filter("clear drops history", |op| !matches!(op, Op::Clear))
}

type SimRuntime = Runtime<SimDriver, SimEnv, MemoryPreferenceStore>;

async fn settle(runtime: &mut SimRuntime, driver: &SimDriver) -> Result<(), TestCaseError> {
    for _ in 0..1_000 {
        let quit = runtime
            .process_cycle()
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(!quit);
        if driver.is_idle() {
            return Ok(());
        }
    }
    Err(TestCaseError::fail("simulation did not settle"))
}

/// Run `ops` against a fresh runtime on a single-threaded executor.
fn run_ops(
    ops: Vec<Op>,
    seed: u64,
    packets_per_cycle: usize,
) -> Result<(SimRuntime, SimDriver), TestCaseError> {
    let executor = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    executor.block_on(simulate(ops, seed, packets_per_cycle))
}

/// Checks the standard invariants after every cycle. Returns the runtime and
/// driver once everything has drained.
async fn simulate(
    ops: Vec<Op>,
    seed: u64,
    packets_per_cycle: usize,
) -> Result<(SimRuntime, SimDriver), TestCaseError> {
    let env = SimEnv::with_seed(seed);
    let driver = SimDriver::new(env.clone(), SimBackend::default())
        .with_packets_per_cycle(packets_per_cycle)
        .with_invariants(InvariantRegistry::standard());
    let mut runtime = Runtime::new(
        driver.clone(),
        env.clone(),
        ClientConfig::default(),
        MemoryPreferenceStore::new(),
    );
    let invariants = InvariantRegistry::standard();

    runtime.start().await.map_err(|e| TestCaseError::fail(e.to_string()))?;

    for op in ops {
        match &op {
            Op::Send(text) => driver.inject_input(Input::Send(text.clone())),
            Op::Stop => driver.inject_input(Input::Stop),
            Op::Reconnect => driver.inject_input(Input::Reconnect),
            Op::Clear => driver.inject_input(Input::Clear),
            Op::Disconnect => driver.inject_disconnect("network down"),
            Op::Ping => driver.server_ping(),
            Op::Advance(ms) => env.advance(Duration::from_millis(*ms)),
        }

        let quit = runtime
            .process_cycle()
            .await
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        prop_assert!(!quit);

        let snapshot = SystemSnapshot::from_app(runtime.app());
        prop_assert!(
            invariants.check_all(&snapshot).is_ok(),
            "Invariant violated after {:?}",
            op
        );
    }

    settle(&mut runtime, &driver).await?;
    Ok((runtime, driver))
}

proptest! {
    /// Standard invariants hold after every step, and once the backend has
    /// gone quiet nothing is left loading or streaming.
    #[test]
    fn prop_runtime_settles(
        ops in prop::collection::vec(op_strategy(), 0..40),
        seed in any::<u64>(),
        packets_per_cycle in 1usize..4,
    ) {
        let (runtime, _driver) = run_ops(ops, seed, packets_per_cycle)?;

        let snapshot = SystemSnapshot::from_app(runtime.app());
        prop_assert!(
            InvariantRegistry::quiescent().check_all(&snapshot).is_ok(),
            "Not settled: {:?}",
            snapshot
        );
    }

    /// Every send the app accepted reached the backend exactly once, in order.
    #[test]
    fn prop_accepted_sends_reach_backend(
        ops in prop::collection::vec(op_strategy_without_clear(), 0..40),
        seed in any::<u64>(),
        packets_per_cycle in 1usize..4,
    ) {
        let (runtime, driver) = run_ops(ops, seed, packets_per_cycle)?;

        let sent: Vec<String> = runtime
            .app()
            .store()
            .messages()
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .collect();
        let received = driver.with_backend(|b| b.received().to_vec());
        prop_assert_eq!(sent, received);
    }

    /// The same seed and inputs replay to the same log.
    #[test]
    fn prop_simulation_is_deterministic(
        ops in prop::collection::vec(op_strategy(), 0..25),
        seed in any::<u64>(),
    ) {
        let (first, _) = run_ops(ops.clone(), seed, 2)?;
        let (second, _) = run_ops(ops, seed, 2)?;

        prop_assert_eq!(first.app().store(), second.app().store());
        prop_assert_eq!(
            SystemSnapshot::from_app(first.app()),
            SystemSnapshot::from_app(second.app())
        );
    }
}
