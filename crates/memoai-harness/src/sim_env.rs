//! Simulated environment with virtual time and seeded randomness.
//!
//! `SimEnv` never reads the system clock. Time starts at zero and only moves
//! when a test calls [`SimEnv::advance`] or awaits [`Environment::sleep`].
//! Randomness comes from a ChaCha RNG seeded by the test, so the same seed
//! yields the same message ids on every run.

use std::{
    ops::Sub,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use chrono::{DateTime, TimeDelta, Utc};
use memoai_core::env::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Wall-clock time at virtual instant zero: 2024-01-01T00:00:00Z.
pub const EPOCH_SECS: i64 = 1_704_067_200;

/// Point on the virtual timeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Time elapsed since the simulation started.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    fn sub(self, earlier: Self) -> Duration {
        self.0.saturating_sub(earlier.0)
    }
}

struct Inner {
    now: SimInstant,
    rng: ChaCha8Rng,
}

/// Deterministic environment for simulation.
///
/// Clones share the same clock and RNG.
#[derive(Clone)]
pub struct SimEnv {
    inner: Arc<Mutex<Inner>>,
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEnv {
    /// Environment seeded with 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Environment with a specific RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        let inner = Inner { now: SimInstant::default(), rng: ChaCha8Rng::seed_from_u64(seed) };
        Self { inner: Arc::new(Mutex::new(inner)) }
    }

    /// Move virtual time forward.
    pub fn advance(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.now = SimInstant(inner.now.0 + duration);
    }

    /// Time elapsed since the simulation started.
    pub fn elapsed(&self) -> Duration {
        self.now().elapsed()
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).now
    }

    fn wall_clock(&self) -> DateTime<Utc> {
        let base = DateTime::from_timestamp(EPOCH_SECS, 0).unwrap_or_default();
        let elapsed = TimeDelta::from_std(self.elapsed()).unwrap_or(TimeDelta::MAX);
        base.checked_add_signed(elapsed).unwrap_or(base)
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner).rng.fill_bytes(buffer);
    }
}
