//! Environment abstraction for deterministic testing.
//!
//! Decouples client logic from system resources (time, randomness). Enables
//! deterministic simulation (virtual clock, seeded RNG) and production use
//! with real system resources.

use std::time::Duration;

use chrono::{DateTime, Utc};

/// Abstract environment providing time, randomness, and async primitives.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `random_bytes()` given the same seed produces the same sequence in
///   simulation
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic). Drives timeouts and reconnect scheduling.
    fn now(&self) -> Self::Instant;

    /// Current wall-clock time. Used only for message and wire timestamps.
    fn wall_clock(&self) -> DateTime<Utc>;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; state machines never do.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Generates a random `u128`. Used for message ids.
    fn random_u128(&self) -> u128 {
        let mut bytes = [0u8; 16];
        self.random_bytes(&mut bytes);
        u128::from_be_bytes(bytes)
    }
}
