//! Production Environment implementation using system time and RNG.
//!
//! `SystemEnv` is the production implementation of the Environment trait using
//! real system time and the OS RNG.
//!
//! # Capabilities
//!
//! - Real monotonic time (`std::time::Instant`) that advances naturally
//! - Real wall-clock time (`chrono::Utc::now`) for message timestamps
//! - OS RNG (getrandom) for message ids. Not reproducible
//! - Tokio async sleep for actual wall-clock delays

use std::time::Duration;

use chrono::{DateTime, Utc};
use memoai_core::env::Environment;

/// Production environment using system time and OS randomness.
///
/// # Panics
///
/// Panics if the OS RNG fails. Message ids must be unique and there is no
/// meaningful fallback; RNG failure indicates OS-level issues.
#[derive(Clone, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = std::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG failure is unrecoverable");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(clippy::disallowed_methods)]
    fn system_env_time_advances() {
        let env = SystemEnv::new();

        let t1 = env.now();
        std::thread::sleep(Duration::from_millis(10));
        let t2 = env.now();

        assert!(t2 > t1, "Time should advance");
    }

    #[test]
    fn generated_ids_differ() {
        let env = SystemEnv::new();
        assert_ne!(env.random_u128(), env.random_u128());
    }

    #[tokio::test]
    async fn system_env_sleep_works() {
        let env = SystemEnv::new();

        let start = env.now();
        env.sleep(Duration::from_millis(50)).await;
        let elapsed = env.now() - start;

        assert!(elapsed >= Duration::from_millis(50), "Sleep should wait at least 50ms");
    }
}
